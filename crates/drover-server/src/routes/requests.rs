use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use drover_core::talk::{ReqKind, Request};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IntakePayload {
    pub project: String,
    pub issue: u64,
    pub kind: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    pub author: String,
}

/// POST /api/requests — enqueue a build request for the next starter phase.
pub async fn post_request(
    State(app): State<AppState>,
    Json(payload): Json<IntakePayload>,
) -> Result<impl IntoResponse, AppError> {
    let kind: ReqKind = payload.kind.parse()?;
    let mut request = Request::new(payload.project, payload.issue, kind, payload.author);
    request.args = payload.args;
    let id = request.id;
    let talk = request.talk_name();
    app.queue.push(request)?;
    tracing::info!(%talk, %kind, "request queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "id": id, "talk": talk })),
    ))
}
