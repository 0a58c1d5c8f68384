use axum::extract::State;
use axum::Json;
use drover_core::pulse::Tick;

use crate::state::AppState;

/// GET /api/ticks — the bounded pass history, oldest first.
pub async fn list_ticks(State(app): State<AppState>) -> Json<Vec<Tick>> {
    Json(app.pulse.ticks())
}
