use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::Field},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, error::AppError};
use crate::nutrition::EntryRecord;
use crate::pipeline::PipelineOverrides;
use crate::providers::sniff_mime_type;
use crate::store::{UserRecord, image_key};
use crate::types::{EntryId, SessionId, UserId};

pub const SESSION_COOKIE: &str = "session";

pub async fn root_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}

#[derive(Debug, Default, Deserialize)]
pub struct OAuthParams {
    session: Option<String>,
    code: Option<String>,
}

/// Known session: the user row. No code: redirect to the identity provider.
/// Code: exchange it, open a session, create the user on first sign-in.
pub async fn oauth_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<OAuthParams>,
) -> Result<Response, AppError> {
    if let Some(sid) = params.session.clone().or_else(|| session_cookie(&headers)) {
        let sid = SessionId::new(sid);
        if let Some(uid) = state.sessions.session_user(&sid).await? {
            if let Some(user) = state.sessions.find_user(&uid).await? {
                return Ok(Json(user).into_response());
            }
        }
    }

    let identity = state
        .identity
        .as_ref()
        .ok_or(AppError::IdentityUnavailable)?;

    let Some(code) = params.code else {
        return Ok(Redirect::to(&identity.authorization_url()).into_response());
    };

    let who = identity.exchange_code(&code).await?;
    let uid = UserId::new(who.email);
    let sid = SessionId::generate();
    state.sessions.create_session(&sid, &uid).await?;

    let user = match state.sessions.find_user(&uid).await? {
        Some(user) => user,
        None => {
            let user = UserRecord {
                uid: uid.clone(),
                username: who.name.unwrap_or_else(|| uid.to_string()),
            };
            state.sessions.insert_user(&user).await?;
            log::info!("created user {uid}");
            user
        }
    };

    let cookie = format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly");
    Ok(([(header::SET_COOKIE, cookie)], Json(user)).into_response())
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}

#[derive(Default)]
struct ImageUpload {
    image: Option<(Vec<u8>, Option<String>)>,
    eid: Option<String>,
    uid: Option<String>,
    timestamp: Option<i64>,
    overrides: PipelineOverrides,
}

/// Multipart photo upload: estimate, store the image, persist the entry.
pub async fn image_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<EntryRecord>, AppError> {
    let mut upload = ImageUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::MalformedPayload(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "img" => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::MalformedPayload(e.to_string()))?;
                upload.image = Some((bytes.to_vec(), content_type));
            }
            "eid" => upload.eid = Some(text(field).await?),
            "uid" => upload.uid = Some(text(field).await?),
            "timestamp" => upload.timestamp = Some(number(field, "timestamp").await?),
            "samples" => upload.overrides.fan_out_count = Some(number(field, "samples").await?),
            "quorum" => upload.overrides.min_quorum = Some(number(field, "quorum").await?),
            other => log::debug!("ignoring form field {other}"),
        }
    }

    let (image, declared_type) = upload.image.ok_or(AppError::MissingField("img"))?;
    let eid = EntryId::new(upload.eid.ok_or(AppError::MissingField("eid"))?);
    let uid = UserId::new(upload.uid.ok_or(AppError::MissingField("uid"))?);
    let timestamp = upload
        .timestamp
        .unwrap_or_else(|| chrono::Utc::now().timestamp());

    let result = state
        .pipeline
        .run_pipeline(&image, &state.instruction, &upload.overrides)
        .await?;

    let content_type = declared_type
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| sniff_mime_type(&image).to_string());
    let key = image_key(&uid, &eid, &content_type);
    let image_url = state.blobs.put_image(&key, image, &content_type).await?;

    let entry = EntryRecord::new(eid, uid, image_url, timestamp, &result);
    state.entries.insert_entry(&entry).await?;

    Ok(Json(entry))
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map(|s| s.trim().to_string())
        .map_err(|e| AppError::MalformedPayload(e.to_string()))
}

async fn number<T: std::str::FromStr>(field: Field<'_>, name: &str) -> Result<T, AppError> {
    let raw = text(field).await?;
    raw.parse()
        .map_err(|_| AppError::MalformedPayload(format!("{name} is not a number: {raw}")))
}
