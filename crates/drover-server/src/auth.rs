use crate::state::AppState;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Header carrying the shared admin secret.
pub const ADMIN_HEADER: &str = "x-drover-admin";

/// Admin-only gate for mutating routes. A daemon with no admin token
/// configured has its admin surface disabled outright.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = &state.admin_token else {
        return Err((
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "admin surface is disabled" })),
        )
            .into_response());
    };
    let given = headers.get(ADMIN_HEADER).and_then(|v| v.to_str().ok());
    if given != Some(expected.as_str()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "sorry, this entrance is staff only" })),
        )
            .into_response());
    }
    Ok(())
}
