//! Subscriber use-case service.
//!
//! # Responsibility
//! - Provide subscribe/confirm/unsubscribe/delivery entry points for callers.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Write entry points validate the address shape before the repository
//!   sees it. Reads and unsubscribes accept addresses as stored.
//! - Service layer remains storage-agnostic.

use crate::model::email_entry::{validate_email, EmailEntry, EntryId};
use crate::repo::email_repo::{BatchQuery, EmailRepository, RepoError, RepoResult};
use chrono::{DateTime, Utc};

/// Result of a subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new row was created with the returned id.
    Created(EntryId),
    /// The address was already registered. Nothing changed.
    AlreadySubscribed,
}

/// Use-case service wrapper for subscriber operations.
pub struct SubscriberService<R: EmailRepository> {
    repo: R,
}

impl<R: EmailRepository> SubscriberService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new, unconfirmed subscriber.
    ///
    /// # Contract
    /// - A duplicate address yields `AlreadySubscribed`, not an error.
    /// - A blank or malformed address yields `RepoError::Validation`.
    pub fn subscribe(&self, email: &str) -> RepoResult<SubscribeOutcome> {
        validate_email(email)?;
        match self.repo.create_email(email) {
            Ok(id) => Ok(SubscribeOutcome::Created(id)),
            Err(RepoError::Constraint { .. }) => Ok(SubscribeOutcome::AlreadySubscribed),
            Err(err) => Err(err),
        }
    }

    /// Gets one subscriber by address.
    pub fn lookup(&self, email: &str) -> RepoResult<Option<EmailEntry>> {
        self.repo.get_email(email)
    }

    /// Records a confirmation time for `email`.
    ///
    /// # Contract
    /// - Existing rows keep their opt-out flag.
    /// - Unknown addresses are inserted as confirmed, subscribed rows.
    /// - One conditional write, so a concurrent unsubscribe is never undone.
    pub fn confirm(&self, email: &str, at: DateTime<Utc>) -> RepoResult<()> {
        validate_email(email)?;
        self.repo.confirm_email(email, at)
    }

    /// Writes `entry` as-is through the repository upsert.
    pub fn save(&self, entry: &EmailEntry) -> RepoResult<()> {
        entry.validate()?;
        self.repo.upsert_email(entry)
    }

    /// Opts `email` out of deliveries. Unknown addresses are ignored.
    pub fn unsubscribe(&self, email: &str) -> RepoResult<()> {
        self.repo.soft_delete_email(email)
    }

    /// Returns one page of active subscribers in insertion order.
    pub fn delivery_batch(&self, page: i64, count: i64) -> RepoResult<Vec<EmailEntry>> {
        self.repo.get_batch(&BatchQuery::new(page, count))
    }
}
