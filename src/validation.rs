use std::path::Path;

use crate::error::{FinanceError, Result};

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_CATEGORY_LEN: usize = 100;
const MAX_INTEREST_RATE: f64 = 1000.0;
const MAX_PAGE_SIZE: usize = 1000;

fn invalid(message: impl Into<String>) -> FinanceError {
    FinanceError::InvalidInput(message.into())
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate contact name
    pub fn validate_contact_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(invalid("Contact name cannot be empty"));
        }

        if name.chars().count() > MAX_NAME_LEN {
            return Err(invalid(format!("Contact name too long (max {MAX_NAME_LEN} characters)")));
        }

        if name.chars().any(char::is_control) {
            return Err(invalid("Contact name contains invalid characters"));
        }

        Ok(())
    }

    /// Validate phone number format
    pub fn validate_phone(phone: &str) -> Result<()> {
        if phone.trim().is_empty() {
            return Err(invalid("Phone number cannot be empty"));
        }

        if let Some(c) = phone.chars().find(|c| !(c.is_ascii_digit() || " -+().".contains(*c))) {
            return Err(invalid(format!("Phone number contains invalid character '{c}'")));
        }

        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if !(7..=15).contains(&digits) {
            return Err(invalid("Phone number must be between 7 and 15 digits"));
        }

        Ok(())
    }

    /// Validate a monetary amount: finite and strictly positive
    pub fn validate_amount(amount: f64) -> Result<()> {
        if !amount.is_finite() {
            return Err(FinanceError::InvalidAmount(format!("{amount} is not a finite number")));
        }

        if amount <= 0.0 {
            return Err(FinanceError::InvalidAmount(format!("{amount} must be greater than zero")));
        }

        Ok(())
    }

    /// Validate an interest rate in percent
    pub fn validate_interest_rate(rate: f64) -> Result<()> {
        if !rate.is_finite() || !(0.0..=MAX_INTEREST_RATE).contains(&rate) {
            return Err(FinanceError::InvalidAmount(format!(
                "Interest rate {rate} must be between 0 and {MAX_INTEREST_RATE}"
            )));
        }

        Ok(())
    }

    /// Validate transaction description
    pub fn validate_description(description: &str) -> Result<()> {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(invalid(format!("Description too long (max {MAX_DESCRIPTION_LEN} characters)")));
        }

        Ok(())
    }

    /// Validate transaction category
    pub fn validate_category(category: &str) -> Result<()> {
        if category.trim().is_empty() {
            return Err(invalid("Category cannot be blank"));
        }

        if category.chars().count() > MAX_CATEGORY_LEN {
            return Err(invalid(format!("Category too long (max {MAX_CATEGORY_LEN} characters)")));
        }

        Ok(())
    }

    /// Validate a backup file name: a bare `.json` file name
    pub fn validate_backup_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(invalid("Backup file name cannot be empty"));
        }

        if name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(invalid("Backup file name must not contain path components"));
        }

        if Path::new(name).extension().and_then(|ext| ext.to_str()) != Some("json") {
            return Err(invalid("Backup file name must end in .json"));
        }

        Ok(())
    }

    /// Validate an inclusive range of epoch milliseconds
    pub fn validate_date_range(start: i64, end: i64) -> Result<()> {
        if start > end {
            return Err(invalid("Start date cannot be after end date"));
        }

        Ok(())
    }

    /// Validate page size for paginated listings
    pub fn validate_page_size(size: usize) -> Result<()> {
        if size == 0 {
            return Err(invalid("Page size must be greater than 0"));
        }

        if size > MAX_PAGE_SIZE {
            return Err(invalid(format!("Page size too large (max {MAX_PAGE_SIZE})")));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_rejections_are_invalid_amount() {
        assert!(matches!(InputValidator::validate_amount(0.0), Err(FinanceError::InvalidAmount(_))));
        assert!(matches!(InputValidator::validate_amount(f64::NAN), Err(FinanceError::InvalidAmount(_))));
        assert!(InputValidator::validate_amount(0.01).is_ok());
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(InputValidator::sanitize_text("  rent\u{7}  "), "rent");
    }
}
