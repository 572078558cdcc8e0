//! Explicit request-shape checks.
//!
//! Request bodies deserialize into structs whose fields are all optional, then
//! run through a [`Validator`] that collects every failing field before
//! rejecting, so clients see the full list in one response.

use crate::error::{AppError, FieldError, Result};

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a non-blank string; returns it trimmed.
    pub fn required(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => {
                self.fail(field, format!("{field} is required"));
                None
            }
        }
    }

    /// Require a present, non-empty value without trimming it.
    pub fn required_raw(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => {
                self.fail(field, format!("{field} is required"));
                None
            }
        }
    }

    /// Require a present array.
    pub fn required_list<'a, T>(&mut self, field: &str, value: Option<&'a [T]>) -> Option<&'a [T]> {
        if value.is_none() {
            self.fail(field, format!("{field} is required and must be an array"));
        }
        value
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.fail(field, message);
        }
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Reject with the collected errors, if any.
    pub fn finish(self, summary: &str) -> Result<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(self.into_error(summary))
    }

    pub fn into_error(self, summary: &str) -> AppError {
        AppError::Validation {
            message: summary.to_string(),
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        let mut v = Validator::new();
        assert_eq!(v.required("name", Some("  Ada ")).as_deref(), Some("Ada"));
        assert!(v.is_valid());
        assert!(v.required("name", Some("   ")).is_none());
        assert!(v.required("email", None).is_none());
        assert!(!v.is_valid());
    }

    #[test]
    fn required_raw_keeps_whitespace() {
        let mut v = Validator::new();
        assert_eq!(v.required_raw("password", Some(" pw ")).as_deref(), Some(" pw "));
        assert!(v.required_raw("password", Some("")).is_none());
    }

    #[test]
    fn finish_collects_every_field() {
        let mut v = Validator::new();
        v.required("email", None);
        v.required("name", Some(""));
        v.check(false, "password", "too short");

        match v.finish("All fields are required.") {
            Err(AppError::Validation { message, errors }) => {
                assert_eq!(message, "All fields are required.");
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, ["email", "name", "password"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn finish_passes_when_clean() {
        let mut v = Validator::new();
        v.required("email", Some("a@b.com"));
        v.required_list("responses", Some(&[1, 2][..]));
        assert!(v.finish("unused").is_ok());
    }
}
