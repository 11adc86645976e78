//! # Form Pipeline
//!
//! Both forms go through the same stages:
//!
//! ```text
//! Received -> CooldownCheck -> Validating -> [Sanitizing] -> [DuplicateCheck] -> Persisting -> Completed
//! ```
//!
//! - `Rejected` from `CooldownCheck` (please wait) or `Validating` (first violation)
//! - `Failed` from `Persisting` (generic message, the store error stays in the logs)
//!
//! Contact goes through `Sanitizing`, waitlist through `DuplicateCheck`.
//!
//! ## Waitlist duplicates
//! The waitlist insert is the duplicate check: the gateway refuses a second row
//! for the same email with a uniqueness violation, which is reported as a
//! success with `alreadyExists`. Two racing joins for one email therefore get
//! one "joined" and one "already exists" and never two rows.
//!
//! Nothing is retried. Every failure is folded into an [`Outcome`] here so
//! callers only ever look at `success`.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::{
    clock::Clock,
    cooldown::{Cooldown, CooldownActive},
    gateway::{ContactSubmission, Gateway, StoreError, WaitlistEntry},
    sanitize::sanitize_html,
    schema::{ContactFields, FieldViolations, ValidationError, validate_contact, validate_waitlist},
};

pub const COOLDOWN_MESSAGE: &str = "Please wait a moment before submitting again";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again.";

pub const CONTACT_SUCCESS: &str = "Thank you for your message! I will get back to you soon.";
pub const CONTACT_FAILURE: &str = "Failed to submit form. Please try again.";

pub const WAITLIST_JOINED: &str =
    "Thank you for joining our waitlist! We'll notify you when we launch.";
pub const WAITLIST_EXISTS: &str =
    "You're already on our waitlist! We'll notify you when we launch.";
pub const WAITLIST_FAILURE: &str = "Error processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    CooldownCheck,
    Validating,
    Sanitizing,
    DuplicateCheck,
    Persisting,
    Completed,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Contact,
    Waitlist,
}

impl Flow {
    fn name(self) -> &'static str {
        match self {
            Flow::Contact => "contact",
            Flow::Waitlist => "waitlist",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Flow::Contact => CONTACT_FAILURE,
            Flow::Waitlist => WAITLIST_FAILURE,
        }
    }
}

#[derive(Error, Debug)]
enum FormError {
    #[error(transparent)]
    RateLimited(#[from] CooldownActive),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<FieldViolations> for FormError {
    fn from(violations: FieldViolations) -> Self {
        FormError::Invalid(violations.into_first())
    }
}

enum Joined {
    New,
    AlreadyExists,
}

/// What the submitter sees.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_exists: Option<bool>,
}

impl Outcome {
    pub fn success(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            already_exists: None,
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            already_exists: None,
        }
    }
}

/// A finished run through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub outcome: Outcome,
    pub terminal: Stage,
    /// New cooldown start, set only when the submission completed.
    pub stamp: Option<DateTime<Utc>>,
}

impl Submission {
    fn completed(from: Stage, outcome: Outcome, at: DateTime<Utc>) -> Self {
        advance(from, Stage::Completed);

        Self {
            outcome,
            terminal: Stage::Completed,
            stamp: Some(at),
        }
    }

    fn refused(flow: Flow, err: FormError) -> Self {
        let (terminal, message) = match err {
            FormError::RateLimited(active) => {
                info!(flow = flow.name(), remaining = %active.remaining, "Submission inside cooldown");
                (Stage::Rejected, COOLDOWN_MESSAGE.to_string())
            }
            FormError::Invalid(violation) => {
                debug!(flow = flow.name(), field = violation.field, "Submission failed validation");
                (Stage::Rejected, violation.message)
            }
            FormError::Store(err) => {
                error!(flow = flow.name(), error = %err, "Store write failed");
                (Stage::Failed, flow.failure_message().to_string())
            }
        };

        Self {
            outcome: Outcome {
                success: false,
                message,
                already_exists: None,
            },
            terminal,
            stamp: None,
        }
    }
}

fn advance(from: Stage, to: Stage) {
    debug!(?from, ?to, "Pipeline stage");
}

pub struct FormPipeline {
    gateway: Arc<dyn Gateway>,
    clock: Arc<dyn Clock>,
    cooldown: Cooldown,
}

impl FormPipeline {
    pub fn new(gateway: Arc<dyn Gateway>, clock: Arc<dyn Clock>, cooldown: Cooldown) -> Self {
        Self {
            gateway,
            clock,
            cooldown,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    pub fn cooldown(&self) -> Cooldown {
        self.cooldown
    }

    /// `stamp` is the raw cooldown cookie value, if the client sent one.
    #[instrument(name = "submit_contact", skip_all)]
    pub async fn submit_contact(&self, fields: &ContactFields, stamp: Option<&str>) -> Submission {
        let now = self.clock.now();

        match self.try_submit_contact(fields, stamp, now).await {
            Ok(()) => Submission::completed(Stage::Persisting, Outcome::success(CONTACT_SUCCESS), now),
            Err(err) => Submission::refused(Flow::Contact, err),
        }
    }

    #[instrument(name = "join_waitlist", skip_all)]
    pub async fn join_waitlist(&self, email: &str, stamp: Option<&str>) -> Submission {
        let now = self.clock.now();

        match self.try_join_waitlist(email, stamp, now).await {
            Ok(Joined::New) => {
                Submission::completed(Stage::Persisting, Outcome::success(WAITLIST_JOINED), now)
            }
            Ok(Joined::AlreadyExists) => {
                let mut outcome = Outcome::success(WAITLIST_EXISTS);
                outcome.already_exists = Some(true);

                Submission::completed(Stage::DuplicateCheck, outcome, now)
            }
            Err(err) => Submission::refused(Flow::Waitlist, err),
        }
    }

    async fn try_submit_contact(
        &self,
        fields: &ContactFields,
        stamp: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), FormError> {
        advance(Stage::Received, Stage::CooldownCheck);
        self.cooldown.check(stamp, now)?;

        advance(Stage::CooldownCheck, Stage::Validating);
        let form = validate_contact(fields)?;

        advance(Stage::Validating, Stage::Sanitizing);
        let record = ContactSubmission {
            name: form.name,
            email: form.email,
            company: form.company,
            subject: form.subject,
            message: sanitize_html(&form.message),
            created_at: now,
        };

        advance(Stage::Sanitizing, Stage::Persisting);
        self.gateway.insert_contact_submission(&record).await?;

        Ok(())
    }

    async fn try_join_waitlist(
        &self,
        email: &str,
        stamp: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Joined, FormError> {
        advance(Stage::Received, Stage::CooldownCheck);
        self.cooldown.check(stamp, now)?;

        advance(Stage::CooldownCheck, Stage::Validating);
        let email = validate_waitlist(email)?;

        advance(Stage::Validating, Stage::DuplicateCheck);
        let entry = WaitlistEntry {
            email,
            created_at: now,
        };

        match self.gateway.insert_waitlist_entry(&entry).await {
            Ok(()) => {
                advance(Stage::DuplicateCheck, Stage::Persisting);
                Ok(Joined::New)
            }
            Err(StoreError::UniqueConstraintViolation) => {
                debug!("Waitlist email already present");
                Ok(Joined::AlreadyExists)
            }
            Err(err) => Err(err.into()),
        }
    }
}
