//! # Folio Documentation
//!
//! Backend for a one-person consulting site: a contact form and a product
//! waitlist, both guarded by a cookie cooldown and a per-IP limiter.
//!
//! ## Notes
//!
//! ### 10/15/26
//! - Contact submissions are append only, the waitlist is unique by email
//! - Emails are stored exactly as typed, so `A@x.com` and `a@x.com` are two entries
//! - Limiter table lives in process memory, so it resets on restart and is per replica

pub mod client;
