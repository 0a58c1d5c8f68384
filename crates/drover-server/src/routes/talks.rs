use axum::extract::State;
use axum::Json;
use drover_core::talk::Talk;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/talks — active talks with their full stage documents.
pub async fn list_talks(State(app): State<AppState>) -> Result<Json<Vec<Talk>>, AppError> {
    let mut talks = Vec::new();
    for name in app.talks.active()? {
        talks.push(app.talks.get(&name)?);
    }
    Ok(Json(talks))
}
