use chrono::{DateTime, Utc};
use mailreg_core::model::email_entry::{validate_email, UNASSIGNED_ID};
use mailreg_core::{EmailEntry, EmailValidationError};

#[test]
fn new_entry_is_unconfirmed_and_active() {
    let entry = EmailEntry::new("a@x.com");

    assert_eq!(entry.id, UNASSIGNED_ID);
    assert_eq!(entry.email, "a@x.com");
    assert_eq!(entry.confirmed_at, DateTime::<Utc>::UNIX_EPOCH);
    assert!(!entry.is_confirmed());
    assert!(entry.is_active());
}

#[test]
fn confirm_truncates_to_whole_seconds() {
    let mut entry = EmailEntry::new("a@x.com");
    entry.confirm(DateTime::from_timestamp(1_700_000_123, 999_999_999).unwrap());

    assert!(entry.is_confirmed());
    assert_eq!(entry.confirmed_at.timestamp(), 1_700_000_123);
    assert_eq!(entry.confirmed_at.timestamp_subsec_nanos(), 0);
}

#[test]
fn soft_delete_marks_entry_inactive() {
    let mut entry = EmailEntry::new("a@x.com");
    entry.soft_delete();

    assert!(entry.opt_out);
    assert!(!entry.is_active());
}

#[test]
fn serialization_uses_epoch_seconds() {
    let mut entry = EmailEntry::new("wire@x.com");
    entry.id = 7;
    entry.confirm(DateTime::from_timestamp(1_700_000_000, 0).unwrap());

    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["id"], 7);
    assert_eq!(json["email"], "wire@x.com");
    assert_eq!(json["confirmed_at"], 1_700_000_000_i64);
    assert_eq!(json["opt_out"], false);

    let decoded: EmailEntry = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, entry);
}

#[test]
fn validate_rejects_blank_and_malformed_addresses() {
    assert_eq!(validate_email(""), Err(EmailValidationError::Empty));
    assert_eq!(validate_email(" \t"), Err(EmailValidationError::Empty));
    assert_eq!(
        validate_email("two@@x.com"),
        Err(EmailValidationError::Malformed("two@@x.com".to_string()))
    );
    assert_eq!(
        validate_email("spaced name@x.com"),
        Err(EmailValidationError::Malformed("spaced name@x.com".to_string()))
    );
    assert!(validate_email("first.last+tag@example.org").is_ok());
}
