use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

// GET /api/wizards/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let handle = state.wizard(id).await?;
    let (filename, ics) = handle
        .lock()
        .await
        .calendar_export()
        .ok_or_else(|| AppError::NotFound(format!("confirmed appointment for booking {id}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
