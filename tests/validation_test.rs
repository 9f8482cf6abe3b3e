//! Unit tests for validation.rs module

use finance_tracker::error::FinanceError;
use finance_tracker::validation::InputValidator;

#[test]
fn test_validate_contact_name() {
    assert!(InputValidator::validate_contact_name("John Doe").is_ok());
    assert!(InputValidator::validate_contact_name(&"a".repeat(100)).is_ok());
    assert!(InputValidator::validate_contact_name("").is_err());
    assert!(InputValidator::validate_contact_name("   ").is_err());
    assert!(InputValidator::validate_contact_name(&"a".repeat(101)).is_err());
    assert!(InputValidator::validate_contact_name("Bad\u{0007}Name").is_err());
}

#[test]
fn test_validate_phone() {
    assert!(InputValidator::validate_phone("+237 690-12-34-56").is_ok());
    assert!(InputValidator::validate_phone("(555) 123.4567").is_ok());
    assert!(InputValidator::validate_phone("123456").is_err());
    assert!(InputValidator::validate_phone(&"1".repeat(16)).is_err());
    assert!(InputValidator::validate_phone("555-CALL-NOW").is_err());
    assert!(InputValidator::validate_phone(" ").is_err());
}

#[test]
fn test_validate_amount() {
    assert!(InputValidator::validate_amount(0.01).is_ok());
    assert!(InputValidator::validate_amount(1_000_000.0).is_ok());
    for amount in [0.0, -5.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert!(
            matches!(InputValidator::validate_amount(amount), Err(FinanceError::InvalidAmount(_))),
            "{amount} accepted"
        );
    }
}

#[test]
fn test_validate_interest_rate() {
    assert!(InputValidator::validate_interest_rate(0.0).is_ok());
    assert!(InputValidator::validate_interest_rate(12.5).is_ok());
    assert!(InputValidator::validate_interest_rate(1000.0).is_ok());
    assert!(InputValidator::validate_interest_rate(-0.5).is_err());
    assert!(InputValidator::validate_interest_rate(1000.1).is_err());
    assert!(InputValidator::validate_interest_rate(f64::NAN).is_err());
}

#[test]
fn test_validate_description_and_category() {
    assert!(InputValidator::validate_description("").is_ok());
    assert!(InputValidator::validate_description(&"é".repeat(500)).is_ok());
    assert!(InputValidator::validate_description(&"x".repeat(501)).is_err());

    assert!(InputValidator::validate_category("Food").is_ok());
    assert!(InputValidator::validate_category(" ").is_err());
    assert!(InputValidator::validate_category(&"c".repeat(101)).is_err());
}

#[test]
fn test_validate_backup_name() {
    assert!(InputValidator::validate_backup_name("backup_2024-05-29T10-00-00.000Z.json").is_ok());
    assert!(InputValidator::validate_backup_name("").is_err());
    assert!(InputValidator::validate_backup_name("../secrets.json").is_err());
    assert!(InputValidator::validate_backup_name("nested/backup.json").is_err());
    assert!(InputValidator::validate_backup_name("backup.txt").is_err());
}

#[test]
fn test_validate_date_range() {
    assert!(InputValidator::validate_date_range(0, 0).is_ok());
    assert!(InputValidator::validate_date_range(-86_400_000, 0).is_ok());
    assert!(InputValidator::validate_date_range(10, 9).is_err());
}

#[test]
fn test_validate_page_size() {
    assert!(InputValidator::validate_page_size(1).is_ok());
    assert!(InputValidator::validate_page_size(1000).is_ok());
    assert!(InputValidator::validate_page_size(0).is_err());
    assert!(InputValidator::validate_page_size(1001).is_err());
}

#[test]
fn test_sanitize_text() {
    assert_eq!(InputValidator::sanitize_text("  Hello\u{0000} World  "), "Hello World");
    assert_eq!(InputValidator::sanitize_text("line\nbreak\ttab"), "line\nbreak\ttab");
    assert_eq!(InputValidator::sanitize_text("   "), "");
}
