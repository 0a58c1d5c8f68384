use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TogglePayload {
    pub read_only: bool,
}

/// PUT /api/toggles/read-only — admin-gated maintenance switch. The
/// scheduler reads it once per pass.
pub async fn put_read_only(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TogglePayload>,
) -> Response {
    if let Err(denied) = require_admin(&app, &headers) {
        return denied;
    }
    app.toggles.set_read_only(payload.read_only);
    tracing::info!(read_only = payload.read_only, "maintenance toggle updated");
    Json(serde_json::json!({ "read_only": app.toggles.read_only() })).into_response()
}
