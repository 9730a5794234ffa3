//! Subscriber repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/get/upsert/soft-delete/batch APIs over the `emails` table.
//! - Map raw rows into `EmailEntry` values.
//! - Translate driver failures into semantic repository errors.
//!
//! # Invariants
//! - Every operation issues exactly one SQL statement.
//! - Upsert is a single conditional write keyed by the `email` unique constraint.
//! - Address shape is not checked here; rows are written and read as given.
//!   `SubscriberService` validates addresses before calling in.
//! - Statements and row cursors are scoped to the call and released on every
//!   return path.
//! - Absence is not an error: `get_email` returns `None`, and soft delete or
//!   upsert-update touching zero rows still succeeds.

use crate::db::{DbError, EMAILS_TABLE};
use crate::model::email_entry::{EmailEntry, EmailValidationError, EntryId};
use chrono::{DateTime, Utc};
use rusqlite::types::FromSql;
use rusqlite::{ffi, params, Connection, Row};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Columns in declared table order. Row mapping reads them by position.
const EMAIL_COLUMNS: [&str; 4] = ["id", "email", "confirmed_at", "opt_out"];

const EMAIL_SELECT_SQL: &str = "SELECT
    id,
    email,
    confirmed_at,
    opt_out
FROM emails";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for subscriber persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Unique-key violation on create. Callers treat this as "already subscribed".
    Constraint { email: String },
    /// A row could not be mapped into an `EmailEntry`.
    Decode {
        message: String,
        cause: Option<rusqlite::Error>,
    },
    /// Any other driver or transport failure.
    Store(DbError),
    /// Address rejected by the service layer before reaching the store.
    Validation(EmailValidationError),
    /// Pagination parameters out of range.
    InvalidPage(BatchQueryError),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constraint { email } => write!(f, "email already registered: {email}"),
            Self::Decode { message, .. } => write!(f, "invalid persisted email row: {message}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidPage(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "connection is missing required table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "table `{table}` is missing required column `{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode {
                cause: Some(err), ..
            } => Some(err),
            Self::Store(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::InvalidPage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(DbError::Sqlite(value))
    }
}

impl From<EmailValidationError> for RepoError {
    fn from(value: EmailValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<BatchQueryError> for RepoError {
    fn from(value: BatchQueryError) -> Self {
        Self::InvalidPage(value)
    }
}

/// Rejected pagination input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchQueryError {
    NonPositivePage(i64),
    NonPositiveCount(i64),
    OffsetOverflow { page: i64, count: i64 },
}

impl Display for BatchQueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositivePage(page) => write!(f, "page must be >= 1, got {page}"),
            Self::NonPositiveCount(count) => write!(f, "count must be >= 1, got {count}"),
            Self::OffsetOverflow { page, count } => {
                write!(f, "page {page} with count {count} overflows the row offset")
            }
        }
    }
}

impl Error for BatchQueryError {}

/// One page of active subscribers, ordered by ascending id.
///
/// `page` is 1-based. Page `n` covers rows `[(n-1)*count, n*count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchQuery {
    pub page: i64,
    pub count: i64,
}

/// Validated `LIMIT`/`OFFSET` pair derived from a `BatchQuery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    pub limit: i64,
    pub offset: i64,
}

impl BatchQuery {
    pub fn new(page: i64, count: i64) -> Self {
        Self { page, count }
    }

    /// Validates the query and returns the row window it covers.
    pub fn window(&self) -> Result<BatchWindow, BatchQueryError> {
        if self.page <= 0 {
            return Err(BatchQueryError::NonPositivePage(self.page));
        }
        if self.count <= 0 {
            return Err(BatchQueryError::NonPositiveCount(self.count));
        }

        let offset = (self.page - 1)
            .checked_mul(self.count)
            .ok_or(BatchQueryError::OffsetOverflow {
                page: self.page,
                count: self.count,
            })?;

        Ok(BatchWindow {
            limit: self.count,
            offset,
        })
    }
}

/// Repository interface for subscriber operations.
pub trait EmailRepository {
    /// Inserts an unconfirmed, subscribed row and returns its store-assigned id.
    fn create_email(&self, email: &str) -> RepoResult<EntryId>;
    /// Looks up one row by exact address.
    fn get_email(&self, email: &str) -> RepoResult<Option<EmailEntry>>;
    /// Inserts `entry` or updates `confirmed_at`/`opt_out` of the existing row.
    fn upsert_email(&self, entry: &EmailEntry) -> RepoResult<()>;
    /// Sets `confirmed_at` for `email`, inserting a subscribed row when missing.
    /// The opt-out flag of an existing row is never touched.
    fn confirm_email(&self, email: &str, at: DateTime<Utc>) -> RepoResult<()>;
    /// Sets `opt_out` for the matching row. Missing rows are a silent success.
    fn soft_delete_email(&self, email: &str) -> RepoResult<()>;
    /// Returns one page of rows with `opt_out = false`.
    fn get_batch(&self, query: &BatchQuery) -> RepoResult<Vec<EmailEntry>>;
}

/// SQLite-backed subscriber repository.
pub struct SqliteEmailRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEmailRepository<'conn> {
    /// Constructs a repository from a connection whose schema is in place.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when `emails` does not exist.
    /// - `MissingRequiredColumn` when `emails` lacks a mapped column.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EmailRepository for SqliteEmailRepository<'_> {
    fn create_email(&self, email: &str) -> RepoResult<EntryId> {
        let result = self.conn.execute(
            "INSERT INTO emails (
                email,
                confirmed_at,
                opt_out
            ) VALUES (?1, 0, 0);",
            [email],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Constraint {
                email: email.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn get_email(&self, email: &str) -> RepoResult<Option<EmailEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EMAIL_SELECT_SQL} WHERE email = ?1;"))?;

        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_email_row(row)?));
        }

        Ok(None)
    }

    fn upsert_email(&self, entry: &EmailEntry) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO emails (
                email,
                confirmed_at,
                opt_out
            ) VALUES (?1, ?2, ?3)
            ON CONFLICT(email) DO UPDATE SET
                confirmed_at = excluded.confirmed_at,
                opt_out = excluded.opt_out;",
            params![
                entry.email.as_str(),
                entry.confirmed_at.timestamp(),
                bool_to_int(entry.opt_out),
            ],
        )?;

        Ok(())
    }

    fn confirm_email(&self, email: &str, at: DateTime<Utc>) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO emails (
                email,
                confirmed_at,
                opt_out
            ) VALUES (?1, ?2, 0)
            ON CONFLICT(email) DO UPDATE SET
                confirmed_at = excluded.confirmed_at;",
            params![email, at.timestamp()],
        )?;

        Ok(())
    }

    fn soft_delete_email(&self, email: &str) -> RepoResult<()> {
        self.conn
            .execute("UPDATE emails SET opt_out = 1 WHERE email = ?1;", [email])?;

        Ok(())
    }

    fn get_batch(&self, query: &BatchQuery) -> RepoResult<Vec<EmailEntry>> {
        let window = query.window()?;

        let mut stmt = self.conn.prepare(&format!(
            "{EMAIL_SELECT_SQL}
             WHERE opt_out = 0
             ORDER BY id ASC
             LIMIT ?1 OFFSET ?2;"
        ))?;

        let mut rows = stmt.query(params![window.limit, window.offset])?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next()? {
            entries.push(parse_email_row(row)?);
        }

        Ok(entries)
    }
}

/// Maps one `emails` row, selected in declared column order, into an entry.
///
/// # Errors
/// - `RepoError::Decode` when the column count or any column type does not
///   match, when `confirmed_at` is out of range, or when `opt_out` is not 0/1.
pub fn parse_email_row(row: &Row<'_>) -> RepoResult<EmailEntry> {
    let column_count = row.as_ref().column_count();
    if column_count != EMAIL_COLUMNS.len() {
        return Err(RepoError::Decode {
            message: format!(
                "expected {} columns, got {column_count}",
                EMAIL_COLUMNS.len()
            ),
            cause: None,
        });
    }

    let id: i64 = decode_column(row, 0)?;
    let email: String = decode_column(row, 1)?;

    let confirmed_secs: i64 = decode_column(row, 2)?;
    let confirmed_at = DateTime::<Utc>::from_timestamp(confirmed_secs, 0).ok_or_else(|| {
        RepoError::Decode {
            message: format!(
                "confirmed_at value `{confirmed_secs}` is out of range in emails.confirmed_at"
            ),
            cause: None,
        }
    })?;

    let opt_out = match decode_column::<i64>(row, 3)? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::Decode {
                message: format!("invalid opt_out value `{other}` in emails.opt_out"),
                cause: None,
            });
        }
    };

    Ok(EmailEntry {
        id,
        email,
        confirmed_at,
        opt_out,
    })
}

fn decode_column<T: FromSql>(row: &Row<'_>, index: usize) -> RepoResult<T> {
    row.get(index).map_err(|err| RepoError::Decode {
        message: format!("cannot read emails.{}: {err}", EMAIL_COLUMNS[index]),
        cause: Some(err),
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [EMAILS_TABLE],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::MissingRequiredTable(EMAILS_TABLE));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([EMAILS_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;

    for column in EMAIL_COLUMNS {
        if !columns.contains(column) {
            return Err(RepoError::MissingRequiredColumn {
                table: EMAILS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
