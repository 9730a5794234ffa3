//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Each repository write is a single SQL statement.
//! - Repository APIs return semantic errors (`Constraint`, `Decode`) in
//!   addition to store transport errors.

pub mod email_repo;
