use chrono::{DateTime, Utc};
use mailreg_core::db::open_db_in_memory;
use mailreg_core::{
    BatchQuery, BatchQueryError, EmailEntry, EmailRepository, EmailValidationError, EntryId,
    RepoError, RepoResult, SqliteEmailRepository, SubscribeOutcome, SubscriberService,
};

/// Repository that lets an unsubscribe for `target` land right after every
/// read and right before the confirmation write, as a concurrent caller would.
struct InterleavedUnsubscribe<'conn> {
    inner: SqliteEmailRepository<'conn>,
    target: &'static str,
}

impl EmailRepository for InterleavedUnsubscribe<'_> {
    fn create_email(&self, email: &str) -> RepoResult<EntryId> {
        self.inner.create_email(email)
    }

    fn get_email(&self, email: &str) -> RepoResult<Option<EmailEntry>> {
        let found = self.inner.get_email(email)?;
        self.inner.soft_delete_email(self.target)?;
        Ok(found)
    }

    fn upsert_email(&self, entry: &EmailEntry) -> RepoResult<()> {
        self.inner.upsert_email(entry)
    }

    fn confirm_email(&self, email: &str, at: DateTime<Utc>) -> RepoResult<()> {
        self.inner.soft_delete_email(self.target)?;
        self.inner.confirm_email(email, at)
    }

    fn soft_delete_email(&self, email: &str) -> RepoResult<()> {
        self.inner.soft_delete_email(email)
    }

    fn get_batch(&self, query: &BatchQuery) -> RepoResult<Vec<EmailEntry>> {
        self.inner.get_batch(query)
    }
}

#[test]
fn subscribe_reports_existing_address_as_already_subscribed() {
    let conn = open_db_in_memory().unwrap();
    let service = SubscriberService::new(SqliteEmailRepository::try_new(&conn).unwrap());

    let first = service.subscribe("a@x.com").unwrap();
    assert!(matches!(first, SubscribeOutcome::Created(_)));

    let second = service.subscribe("a@x.com").unwrap();
    assert_eq!(second, SubscribeOutcome::AlreadySubscribed);
}

#[test]
fn subscribe_propagates_validation_errors() {
    let conn = open_db_in_memory().unwrap();
    let service = SubscriberService::new(SqliteEmailRepository::try_new(&conn).unwrap());

    let err = service.subscribe("nope").unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn confirm_keeps_opt_out_flag_of_existing_row() {
    let conn = open_db_in_memory().unwrap();
    let service = SubscriberService::new(SqliteEmailRepository::try_new(&conn).unwrap());

    let SubscribeOutcome::Created(id) = service.subscribe("a@x.com").unwrap() else {
        panic!("expected a new row");
    };
    service.unsubscribe("a@x.com").unwrap();

    let at = DateTime::from_timestamp(1_700_000_000, 500).unwrap();
    service.confirm("a@x.com", at).unwrap();

    let loaded = service.lookup("a@x.com").unwrap().unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.confirmed_at.timestamp(), 1_700_000_000);
    assert!(loaded.opt_out);
}

#[test]
fn confirm_inserts_unknown_address() {
    let conn = open_db_in_memory().unwrap();
    let service = SubscriberService::new(SqliteEmailRepository::try_new(&conn).unwrap());

    let at = DateTime::from_timestamp(1_650_000_000, 0).unwrap();
    service.confirm("new@x.com", at).unwrap();

    let loaded = service.lookup("new@x.com").unwrap().unwrap();
    assert!(loaded.is_confirmed());
    assert!(loaded.is_active());
}

#[test]
fn save_can_reverse_an_opt_out() {
    let conn = open_db_in_memory().unwrap();
    let service = SubscriberService::new(SqliteEmailRepository::try_new(&conn).unwrap());

    service.subscribe("back@x.com").unwrap();
    service.unsubscribe("back@x.com").unwrap();
    assert!(service.delivery_batch(1, 10).unwrap().is_empty());

    let mut entry = service.lookup("back@x.com").unwrap().unwrap();
    entry.opt_out = false;
    service.save(&entry).unwrap();

    let batch = service.delivery_batch(1, 10).unwrap();
    assert_eq!(batch, vec![entry]);
}

#[test]
fn delivery_batch_validates_page() {
    let conn = open_db_in_memory().unwrap();
    let service = SubscriberService::new(SqliteEmailRepository::try_new(&conn).unwrap());

    let err = service.delivery_batch(-1, 10).unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidPage(BatchQueryError::NonPositivePage(-1))
    ));
}

#[test]
fn confirm_never_undoes_a_concurrent_unsubscribe() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEmailRepository::try_new(&conn).unwrap();
    repo.create_email("r@x.com").unwrap();

    let service = SubscriberService::new(InterleavedUnsubscribe {
        inner: SqliteEmailRepository::try_new(&conn).unwrap(),
        target: "r@x.com",
    });
    let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    service.confirm("r@x.com", at).unwrap();

    let row = repo.get_email("r@x.com").unwrap().unwrap();
    assert!(row.opt_out);
    assert_eq!(row.confirmed_at, at);
}

#[test]
fn confirm_and_save_reject_malformed_addresses() {
    let conn = open_db_in_memory().unwrap();
    let service = SubscriberService::new(SqliteEmailRepository::try_new(&conn).unwrap());

    let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let err = service.confirm("no-at-sign", at).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(EmailValidationError::Malformed(_))
    ));

    let err = service.save(&EmailEntry::new(" ")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(EmailValidationError::Empty)
    ));
    assert!(service.delivery_batch(1, 10).unwrap().is_empty());
}
