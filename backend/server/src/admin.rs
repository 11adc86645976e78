//! # Admin
//!
//! Password gate in front of the stored submissions.
//!
//! - Login checks the `ADMIN_PASSWORD` secret and hands out an `admin_session`
//!   cookie holding a random token made at startup
//! - Reads require that exact token, so a restart logs everyone out
//! - No secret configured means every admin route answers 401
use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use forms::{ContactSubmission, Outcome, WaitlistEntry};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::{error::AppError, routes::payload, state::AppState};

pub const ADMIN_COOKIE: &str = "admin_session";
pub const SESSION_HOURS: i64 = 8;

#[derive(Deserialize)]
pub struct Login {
    #[serde(default)]
    password: String,
}

fn password_matches(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn authorize(state: &AppState, jar: &CookieJar) -> Result<(), AppError> {
    if state.config.admin_password.is_none() {
        return Err(AppError::Unauthorized);
    }

    match jar.get(ADMIN_COOKIE) {
        Some(cookie) if cookie.value() == state.admin_token => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    login: Result<Json<Login>, JsonRejection>,
) -> Result<(CookieJar, Json<Outcome>), AppError> {
    let login = payload("login", login)?;
    let Some(expected) = state.config.admin_password.as_deref() else {
        return Err(AppError::Unauthorized);
    };

    if !password_matches(&login.password, expected) {
        warn!("Failed admin login");
        return Err(AppError::Unauthorized);
    }

    info!("Admin logged in");

    let cookie = Cookie::build((ADMIN_COOKIE, state.admin_token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.secure_cookies())
        .same_site(SameSite::Strict)
        .max_age(time::Duration::hours(SESSION_HOURS));

    Ok((jar.add(cookie), Json(Outcome::success("Logged in"))))
}

pub async fn logout_handler(jar: CookieJar) -> (CookieJar, Json<Outcome>) {
    let jar = jar.remove(Cookie::build(ADMIN_COOKIE).path("/"));

    (jar, Json(Outcome::success("Logged out")))
}

pub async fn contact_submissions_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Vec<ContactSubmission>>, AppError> {
    authorize(&state, &jar)?;

    Ok(Json(state.pipeline.gateway().list_contact_submissions().await?))
}

pub async fn waitlist_entries_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Vec<WaitlistEntry>>, AppError> {
    authorize(&state, &jar)?;

    Ok(Json(state.pipeline.gateway().list_waitlist_entries().await?))
}
