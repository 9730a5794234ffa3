//! Subscriber registry domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core persistence logic.
//!
//! # Invariants
//! - Every subscriber is identified by a unique email address.
//! - Unsubscribing is represented by the opt-out flag, not hard delete.

pub mod email_entry;
