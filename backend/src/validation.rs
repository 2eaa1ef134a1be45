//! Request validation helpers for the workflow API.

use std::collections::HashMap;

use crate::error::{AppError, ValidationBuilder};

pub type ValidationResult<T> = Result<T, AppError>;

fn field_error(field: &str, message: String) -> AppError {
    let mut details = HashMap::new();
    details.insert(field.to_string(), vec![message]);
    AppError::ValidationError { details }
}

/// String validation helpers
pub mod string {
    use super::*;

    /// Validate required non-empty string
    pub fn required(value: &Option<String>, field: &str) -> ValidationResult<String> {
        match value {
            Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(_) => Err(field_error(field, format!("{} cannot be empty", field))),
            None => Err(field_error(field, format!("{} is required", field))),
        }
    }

    /// Trim an optional string, mapping blank to None
    pub fn optional(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Numeric validation
pub mod number {
    use super::*;
    use rust_decimal::Decimal;

    /// Validate decimal/money amount is not negative
    pub fn valid_amount(value: &Decimal, field: &str) -> ValidationResult<Decimal> {
        if value.is_sign_negative() {
            return Err(field_error(field, format!("{} cannot be negative", field)));
        }
        Ok(*value)
    }

    /// Validate a percentage in 0..=100
    pub fn percentage(value: &Decimal, field: &str) -> ValidationResult<Decimal> {
        if value.is_sign_negative() || *value > Decimal::from(100) {
            return Err(field_error(
                field,
                format!("{} must be between 0 and 100", field),
            ));
        }
        Ok(*value)
    }
}

/// Date/time validation
pub mod datetime {
    use super::*;
    use chrono::{DateTime, Utc};

    /// Validate interval start is not after its end
    pub fn valid_range(
        from: &DateTime<Utc>,
        to: &DateTime<Utc>,
        from_field: &str,
        to_field: &str,
    ) -> ValidationResult<()> {
        if from > to {
            return Err(field_error(
                from_field,
                format!("{} must be before {}", from_field, to_field),
            ));
        }
        Ok(())
    }
}

/// Validator builder for multi-field validations
pub struct Validator {
    builder: ValidationBuilder,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            builder: ValidationBuilder::new(),
        }
    }

    pub fn error(mut self, field: &str, message: &str) -> Self {
        self.builder = self.builder.error(field, message);
        self
    }

    pub fn error_if(self, condition: bool, field: &str, message: &str) -> Self {
        if condition {
            self.error(field, message)
        } else {
            self
        }
    }

    pub fn required_string(self, value: &Option<String>, field: &str) -> Self {
        match value {
            Some(s) if !s.trim().is_empty() => self,
            Some(_) => self.error(field, &format!("{} cannot be empty", field)),
            None => self.error(field, &format!("{} is required", field)),
        }
    }

    /// Fold the outcome of a field helper into the accumulated errors.
    /// The helpers in this module only produce field-level validation
    /// errors.
    pub fn check<T>(mut self, result: ValidationResult<T>) -> Self {
        if let Err(AppError::ValidationError { details }) = result {
            for (field, messages) in details {
                for message in messages {
                    self.builder = self.builder.error(&field, &message);
                }
            }
        }
        self
    }

    pub fn finish(self) -> ValidationResult<()> {
        match self.builder.build() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
