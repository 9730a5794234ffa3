//! Subscriber entry domain model.
//!
//! # Responsibility
//! - Define the canonical record for one mailing-list subscriber.
//! - Provide lifecycle helpers for confirmation and opt-out semantics.
//!
//! # Invariants
//! - `id` is assigned by the store on insert and never reassigned.
//! - `email` is the natural key; the store keeps it unique.
//! - `confirmed_at == UNIX_EPOCH` means "not yet confirmed". There is no
//!   separate null state.
//! - `opt_out` is the soft-delete marker. Rows are never removed.

use chrono::{DateTime, SubsecRound, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email shape regex"));

/// Store-assigned row identifier.
pub type EntryId = i64;

/// Placeholder id carried by entries that have not been persisted yet.
pub const UNASSIGNED_ID: EntryId = 0;

/// Validation failures for subscriber entries on write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailValidationError {
    /// Address is empty or whitespace only.
    Empty,
    /// Address does not look like `local@domain`.
    Malformed(String),
}

impl Display for EmailValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "email address cannot be empty"),
            Self::Malformed(email) => write!(f, "malformed email address `{email}`"),
        }
    }
}

impl Error for EmailValidationError {}

/// One subscriber record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailEntry {
    /// Store-assigned id. `UNASSIGNED_ID` until the entry has been read back.
    pub id: EntryId,
    /// Subscriber address, unique across the registry.
    pub email: String,
    /// Confirmation time in whole seconds. Epoch means unconfirmed.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub confirmed_at: DateTime<Utc>,
    /// Excluded from batch delivery when set.
    pub opt_out: bool,
}

impl EmailEntry {
    /// Creates an unconfirmed, subscribed entry that has not been persisted.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: UNASSIGNED_ID,
            email: email.into(),
            confirmed_at: DateTime::<Utc>::UNIX_EPOCH,
            opt_out: false,
        }
    }

    /// Validates fields required by write paths.
    pub fn validate(&self) -> Result<(), EmailValidationError> {
        validate_email(&self.email)
    }

    /// Returns whether the confirmation time has moved past the epoch sentinel.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at > DateTime::<Utc>::UNIX_EPOCH
    }

    /// Records a confirmation, truncated to the precision the store keeps.
    pub fn confirm(&mut self, at: DateTime<Utc>) {
        self.confirmed_at = at.trunc_subsecs(0);
    }

    /// Marks this entry as opted out (soft deleted).
    pub fn soft_delete(&mut self) {
        self.opt_out = true;
    }

    /// Returns whether this entry receives batch deliveries.
    pub fn is_active(&self) -> bool {
        !self.opt_out
    }
}

/// Checks that `email` is non-blank and shaped like `local@domain`.
pub fn validate_email(email: &str) -> Result<(), EmailValidationError> {
    if email.trim().is_empty() {
        return Err(EmailValidationError::Empty);
    }
    if !EMAIL_SHAPE_RE.is_match(email) {
        return Err(EmailValidationError::Malformed(email.to_string()));
    }
    Ok(())
}
