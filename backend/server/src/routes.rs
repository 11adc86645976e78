use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use axum_extra::extract::cookie::CookieJar;
use forms::{
    ContactFields, Outcome, Submission, WaitlistFields,
    cooldown::{CONTACT_COOKIE, WAITLIST_COOKIE},
};
use tracing::warn;

use crate::{
    error::AppError,
    state::AppState,
    utils::{cookie_value, stamp_cooldown},
};

pub(crate) fn payload<T>(flow: &str, payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(fields)| fields).map_err(|rejection| {
        warn!("Rejected {flow} payload: {rejection}");
        AppError::MalformedPayload
    })
}

fn respond(
    state: &AppState,
    jar: CookieJar,
    cookie: &'static str,
    submission: Submission,
) -> (CookieJar, Json<Outcome>) {
    let jar = stamp_cooldown(
        jar,
        cookie,
        submission.stamp,
        state.pipeline.cooldown(),
        state.config.secure_cookies(),
    );

    (jar, Json(submission.outcome))
}

pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    fields: Result<Json<ContactFields>, JsonRejection>,
) -> Result<(CookieJar, Json<Outcome>), AppError> {
    let fields = payload("contact", fields)?;
    let stamp = cookie_value(&jar, CONTACT_COOKIE);

    let submission = state
        .pipeline
        .submit_contact(&fields, stamp.as_deref())
        .await;

    Ok(respond(&state, jar, CONTACT_COOKIE, submission))
}

pub async fn waitlist_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    fields: Result<Json<WaitlistFields>, JsonRejection>,
) -> Result<(CookieJar, Json<Outcome>), AppError> {
    let fields = payload("waitlist", fields)?;
    let stamp = cookie_value(&jar, WAITLIST_COOKIE);

    let submission = state
        .pipeline
        .join_waitlist(&fields.email, stamp.as_deref())
        .await;

    Ok(respond(&state, jar, WAITLIST_COOKIE, submission))
}
