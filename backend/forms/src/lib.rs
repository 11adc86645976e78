//! # Forms
//!
//! Contact form and waitlist signup, from raw fields to a stored row.
//!
//! ## Layers
//!
//! - [`schema`]: field rules, one copy for every caller
//! - [`sanitize`]: markup escaping of the contact message
//! - [`cooldown`]: per-client courtesy throttle kept in a cookie
//! - [`ip_limit`]: per-IP fixed window counter for the request boundary
//! - [`gateway`]: store interface plus an in-memory store
//! - [`pipeline`]: the two flows, composed from the above
//!
//! No HTTP types in here. The server crate reads cookies and IPs and hands
//! plain values down.
pub mod clock;
pub mod cooldown;
pub mod gateway;
pub mod ip_limit;
pub mod pipeline;
pub mod sanitize;
pub mod schema;

pub use clock::{Clock, SystemClock};
pub use cooldown::Cooldown;
pub use gateway::{ContactSubmission, Gateway, MemoryGateway, StoreError, WaitlistEntry};
pub use ip_limit::{IpRateLimiter, Limited};
pub use pipeline::{FormPipeline, Outcome, Stage, Submission};
pub use schema::{ContactFields, WaitlistFields};
