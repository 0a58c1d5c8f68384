use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/status — scheduler state and headline counts.
pub async fn get_status(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let active = app.talks.active()?;
    Ok(Json(serde_json::json!({
        "state": app.routine.state(),
        "active_talks": active.len(),
        "ticks": app.pulse.len(),
        "read_only": app.toggles.read_only(),
    })))
}
