//! # Frontend Specifications
//!
//! Client logic/relevant structures.
//!
//! ## Overall Payloads
//!
//! Responses/requests between the frontend and backend. Everything is JSON.
//!
//! ### Cookies
//! - last_contact_submission: epoch millis of the last accepted contact message, lasting 60 seconds
//! - last_waitlist_submission: epoch millis of the last completed waitlist join, lasting 60 seconds
//! - admin_session: random token handed out by the admin login, lasting 8 hours
//!
//! All of them are HttpOnly, SameSite=Strict, Path=/ and Secure in production.
//!
//! ### Contact
//! To backend, `POST /api/contact`
//! - name, email, company (optional), subject, message
//!
//! From backend
//! - `{ "success": true, "message": "Thank you for your message! I will get back to you soon." }` + cookie
//! - `{ "success": false, "message": "<first field problem>" }`
//! - `{ "success": false, "message": "Please wait a moment before submitting again" }`
//!
//! ### Waitlist
//! To backend, `POST /api/waitlist`
//! - email
//!
//! From backend
//! - `{ "success": true, "message": "..." }` + cookie, first join (no `alreadyExists` field)
//! - `{ "success": true, "message": "...", "alreadyExists": true }` + cookie, repeat join
//! - `{ "success": false, "message": "..." }`
//!
//! ### Limits
//! - Over 60 requests a minute from one IP on `/api/*` gets a 429 with `Retry-After`
//! - A body that is not JSON gets a 400 with the generic failure message
//!
//!
//!
//! ## Flow
//!
//! - Visitor fills out the form, the frontend posts it as is
//! - Show `message` from the reply whatever `success` is
//! - On `alreadyExists`, show the friendly already joined text instead of an error
//! - Do not try to read the cooldown cookies, they are HttpOnly
//!
//!
//!
//! ## Admin
//!
//! - `POST /admin/login` with `{ "password": "..." }`
//! - `GET /admin/contact-submissions` and `GET /admin/waitlist` with the session cookie
//! - `POST /admin/logout` clears the cookie
