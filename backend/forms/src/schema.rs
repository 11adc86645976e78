//! # Validation Schema
//!
//! One set of field rules, shared by every caller that checks a form. The
//! server check is authoritative; a browser check built from the same rules is
//! only there for fast feedback.
//!
//! ## Contact
//! - name: required, at most 100 characters
//! - email: standard email shape
//! - company: optional, at most 100 characters
//! - subject: required, at most 200 characters
//! - message: between 10 and 3000 characters
//!
//! ## Waitlist
//! - email: standard email shape
//!
//! Lengths count characters, not bytes. Fields are checked in the order above
//! and every violation is collected, but callers surface only the first one.
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

pub const NAME_MAX: usize = 100;
pub const COMPANY_MAX: usize = 100;
pub const SUBJECT_MAX: usize = 200;
pub const MESSAGE_MIN: usize = 10;
pub const MESSAGE_MAX: usize = 3000;

pub const CONTACT_EMAIL_MESSAGE: &str = "Invalid email address";
pub const WAITLIST_EMAIL_MESSAGE: &str = "Please enter a valid email address";

// No look-around in `regex`, so the leading dot and double dot cases are
// checked separately in `is_email`.
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$")
        .expect("email pattern is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every violated rule of one form, in field order. Never empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{first}")]
pub struct FieldViolations {
    first: ValidationError,
    rest: Vec<ValidationError>,
}

impl FieldViolations {
    fn collect(mut violations: Vec<ValidationError>) -> Option<Self> {
        if violations.is_empty() {
            return None;
        }

        let first = violations.remove(0);
        Some(Self {
            first,
            rest: violations,
        })
    }

    pub fn first(&self) -> &ValidationError {
        &self.first
    }

    pub fn into_first(self) -> ValidationError {
        self.first
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }
}

/// Raw contact form input. Absent fields deserialize to empty strings so
/// validation is total.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub company: String,
    pub subject: String,
    pub message: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct WaitlistFields {
    pub email: String,
}

/// A contact form that passed every rule. The message is still unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub company: String,
    pub subject: String,
    pub message: String,
}

pub fn is_email(input: &str) -> bool {
    !input.starts_with('.') && !input.contains("..") && EMAIL.is_match(input)
}

fn length(input: &str) -> usize {
    input.chars().count()
}

fn check_required(
    violations: &mut Vec<ValidationError>,
    field: &'static str,
    label: &str,
    value: &str,
    max: usize,
) {
    if value.is_empty() {
        violations.push(ValidationError::new(field, format!("{label} is required")));
    } else if length(value) > max {
        violations.push(ValidationError::new(
            field,
            format!("{label} must be at most {max} characters"),
        ));
    }
}

pub fn validate_contact(fields: &ContactFields) -> Result<ContactForm, FieldViolations> {
    let mut violations = Vec::new();

    check_required(&mut violations, "name", "Name", &fields.name, NAME_MAX);

    if !is_email(&fields.email) {
        violations.push(ValidationError::new("email", CONTACT_EMAIL_MESSAGE));
    }

    if length(&fields.company) > COMPANY_MAX {
        violations.push(ValidationError::new(
            "company",
            format!("Company must be at most {COMPANY_MAX} characters"),
        ));
    }

    check_required(&mut violations, "subject", "Subject", &fields.subject, SUBJECT_MAX);

    let message_length = length(&fields.message);
    if message_length < MESSAGE_MIN {
        violations.push(ValidationError::new(
            "message",
            format!("Message must be at least {MESSAGE_MIN} characters"),
        ));
    } else if message_length > MESSAGE_MAX {
        violations.push(ValidationError::new(
            "message",
            format!("Message must be at most {MESSAGE_MAX} characters"),
        ));
    }

    if let Some(violations) = FieldViolations::collect(violations) {
        return Err(violations);
    }

    Ok(ContactForm {
        name: fields.name.clone(),
        email: fields.email.clone(),
        company: fields.company.clone(),
        subject: fields.subject.clone(),
        message: fields.message.clone(),
    })
}

pub fn validate_waitlist(email: &str) -> Result<String, FieldViolations> {
    if !is_email(email) {
        return Err(FieldViolations {
            first: ValidationError::new("email", WAITLIST_EMAIL_MESSAGE),
            rest: Vec::new(),
        });
    }

    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(message: &str) -> ContactFields {
        ContactFields {
            name: "Jo".to_string(),
            email: "jo@x.com".to_string(),
            company: String::new(),
            subject: "Hi".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_email("jo@x.com"));
        assert!(is_email("first.last+tag@mail.example.co"));
        assert!(is_email("O'Brien@Example.COM"));

        assert!(!is_email(""));
        assert!(!is_email("not-an-email"));
        assert!(!is_email("a@b"));
        assert!(!is_email("a@b.c"));
        assert!(!is_email(".a@b.com"));
        assert!(!is_email("a..b@c.com"));
        assert!(!is_email("a.@b.com"));
        assert!(!is_email("a b@c.com"));
    }

    #[test]
    fn test_message_length_bounds() {
        let short = validate_contact(&contact("short")).unwrap_err();
        assert_eq!(
            short.first().message,
            "Message must be at least 10 characters"
        );

        assert!(validate_contact(&contact("exactly 10")).is_ok());
        assert!(validate_contact(&contact(&"a".repeat(MESSAGE_MAX))).is_ok());
        assert!(validate_contact(&contact(&"a".repeat(MESSAGE_MAX + 1))).is_err());
    }

    #[test]
    fn test_lengths_count_characters() {
        // ten characters, twenty bytes
        assert!(validate_contact(&contact("éééééééééé")).is_ok());

        let mut fields = contact("long enough message");
        fields.name = "ü".repeat(NAME_MAX);
        assert!(validate_contact(&fields).is_ok());
    }

    #[test]
    fn test_first_violation_follows_field_order() {
        let fields = ContactFields {
            name: String::new(),
            email: "nope".to_string(),
            company: "c".repeat(COMPANY_MAX + 1),
            subject: String::new(),
            message: "tiny".to_string(),
        };

        let violations = validate_contact(&fields).unwrap_err();
        let order: Vec<&str> = violations.iter().map(|v| v.field).collect();

        assert_eq!(order, ["name", "email", "company", "subject", "message"]);
        assert_eq!(violations.into_first().message, "Name is required");
    }

    #[test]
    fn test_upper_bounds() {
        let mut fields = contact("long enough message");
        fields.subject = "s".repeat(SUBJECT_MAX + 1);

        assert_eq!(
            validate_contact(&fields).unwrap_err().into_first().message,
            "Subject must be at most 200 characters"
        );
    }

    #[test]
    fn test_company_is_optional() {
        let fields = contact("long enough message");
        assert_eq!(validate_contact(&fields).unwrap().company, "");
    }

    #[test]
    fn test_waitlist_email() {
        let invalid = validate_waitlist("not-an-email").unwrap_err();
        assert_eq!(invalid.first().message, WAITLIST_EMAIL_MESSAGE);
        assert_eq!(invalid.iter().count(), 1);

        assert_eq!(validate_waitlist("valid@example.com").unwrap(), "valid@example.com");
    }
}
