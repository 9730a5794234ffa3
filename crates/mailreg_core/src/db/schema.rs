//! Idempotent creation of the `emails` table.
//!
//! # Responsibility
//! - Issue the table DDL on every process start.
//! - Classify "already exists" as a no-op and every other failure as fatal.
//!
//! # Invariants
//! - Calling `ensure_schema` repeatedly leaves the schema unchanged.
//! - Duplicate detection goes through `DuplicateSchemaError`, so a different
//!   backing store only needs its own implementation of that trait.

use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{ffi, Connection};

/// Name of the single table owned by this crate.
pub const EMAILS_TABLE: &str = "emails";

const EMAILS_TABLE_SQL: &str = include_str!("emails.sql");

/// Capability check for store errors that only report an existing schema object.
pub trait DuplicateSchemaError {
    /// Returns `true` when the error means the relation is already present.
    fn is_duplicate_schema(&self) -> bool;
}

impl DuplicateSchemaError for rusqlite::Error {
    fn is_duplicate_schema(&self) -> bool {
        match self {
            // SQLite reports this as a generic SQLITE_ERROR; the message is the
            // only thing separating it from syntax errors.
            rusqlite::Error::SqliteFailure(err, Some(message)) => {
                (err.extended_code & 0xff) == ffi::SQLITE_ERROR
                    && message.contains("already exists")
            }
            _ => false,
        }
    }
}

/// Creates the `emails` table unless it already exists.
///
/// # Errors
/// - Returns `DbError::Schema` for any failure other than a duplicate table.
///   Callers should abort startup on this error.
pub fn ensure_schema(conn: &Connection) -> DbResult<()> {
    match conn.execute_batch(EMAILS_TABLE_SQL) {
        Ok(()) => {
            info!("event=schema_init module=db status=created table={EMAILS_TABLE}");
            Ok(())
        }
        Err(err) if err.is_duplicate_schema() => {
            info!("event=schema_init module=db status=exists table={EMAILS_TABLE}");
            Ok(())
        }
        Err(err) => {
            error!(
                "event=schema_init module=db status=error table={EMAILS_TABLE} error_code=schema_create_failed error={err}"
            );
            Err(DbError::Schema(err))
        }
    }
}
