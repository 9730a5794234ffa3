//! Core persistence for the mailing-list subscriber registry.
//! This crate owns the `emails` table and every invariant about its rows.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{ensure_schema, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::email_entry::{EmailEntry, EmailValidationError, EntryId};
pub use repo::email_repo::{
    BatchQuery, BatchQueryError, EmailRepository, RepoError, RepoResult, SqliteEmailRepository,
};
pub use service::subscriber_service::{SubscribeOutcome, SubscriberService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
