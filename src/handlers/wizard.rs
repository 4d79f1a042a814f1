use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::availability::parse_time;
use crate::models::{
    CustomerDetails, DetailsPatch, IdentityMode, Service, StepId, SubmissionOutcome,
};
use crate::services::wizard::BookingWizard;
use crate::state::AppState;

#[derive(Serialize)]
pub struct StepView {
    pub step: StepId,
    pub number: usize,
}

/// Everything a client needs to render the current wizard step.
#[derive(Serialize)]
pub struct WizardView {
    pub id: Uuid,
    pub current_step: StepId,
    pub step_number: Option<usize>,
    pub visible_steps: Vec<StepView>,
    pub service: Option<Service>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub slots: Vec<String>,
    pub customer_details: CustomerDetails,
    pub identity_mode: IdentityMode,
    pub identity_locked: bool,
    pub create_account: bool,
    pub submitting: bool,
    pub outcome: Option<SubmissionOutcome>,
    pub calendar_available: bool,
}

impl WizardView {
    pub fn new(id: Uuid, wizard: &BookingWizard) -> Self {
        let draft = wizard.draft();
        let visible_steps = wizard
            .visible_steps()
            .into_iter()
            .enumerate()
            .map(|(i, step)| StepView { step, number: i + 1 })
            .collect();

        Self {
            id,
            current_step: draft.current_step,
            step_number: wizard.step_number(draft.current_step),
            visible_steps,
            service: draft.selected_service.clone(),
            date: draft.selected_date,
            time: draft.selected_time.map(|t| t.format("%H:%M").to_string()),
            slots: wizard
                .slots()
                .iter()
                .map(|t| t.format("%H:%M").to_string())
                .collect(),
            customer_details: draft.customer_details.clone(),
            identity_mode: wizard.identity_mode(),
            identity_locked: wizard.identity_locked(),
            create_account: wizard.create_account(),
            submitting: wizard.is_submitting(),
            outcome: draft.submission_outcome.clone(),
            calendar_available: draft.is_booked(),
        }
    }
}

#[derive(Deserialize, Default)]
pub struct CreateWizardPayload {
    pub service_id: Option<i64>,
}

// POST /api/wizards
pub async fn create_wizard(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<CreateWizardPayload>>,
) -> Result<(StatusCode, Json<WizardView>), AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let mut wizard = state.new_wizard();
    if let Some(service_id) = payload.service_id {
        wizard = wizard.with_service(state.find_service(service_id).await?);
    }

    let id = Uuid::new_v4();
    let view = WizardView::new(id, &wizard);
    state.mount_wizard(id, wizard).await;

    tracing::info!(wizard = %id, service_id = ?payload.service_id, "booking started");
    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/wizards/:id
pub async fn get_wizard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let handle = state.wizard(id).await?;
    let wizard = handle.lock().await;
    Ok(Json(WizardView::new(id, &wizard)))
}

// DELETE /api/wizards/:id
pub async fn close_wizard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.unmount_wizard(id).await?;
    tracing::info!(wizard = %id, "booking closed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SelectServicePayload {
    pub service_id: i64,
}

// POST /api/wizards/:id/service
pub async fn select_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectServicePayload>,
) -> Result<Json<WizardView>, AppError> {
    let service = state.find_service(payload.service_id).await?;
    let handle = state.wizard(id).await?;
    let mut wizard = handle.lock().await;
    wizard.select_service(service)?;
    Ok(Json(WizardView::new(id, &wizard)))
}

#[derive(Deserialize)]
pub struct SelectDatePayload {
    pub date: NaiveDate,
}

// POST /api/wizards/:id/date
pub async fn select_date(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectDatePayload>,
) -> Result<Json<WizardView>, AppError> {
    let handle = state.wizard(id).await?;
    let mut wizard = handle.lock().await;
    wizard.select_date(payload.date).await?;
    Ok(Json(WizardView::new(id, &wizard)))
}

// POST /api/wizards/:id/slots/refresh
pub async fn refresh_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let handle = state.wizard(id).await?;
    let mut wizard = handle.lock().await;
    wizard.refresh_slots().await?;
    Ok(Json(WizardView::new(id, &wizard)))
}

#[derive(Deserialize)]
pub struct SelectTimePayload {
    pub time: String,
}

// POST /api/wizards/:id/time
pub async fn select_time(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectTimePayload>,
) -> Result<Json<WizardView>, AppError> {
    let time = parse_time(&payload.time).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let handle = state.wizard(id).await?;
    let mut wizard = handle.lock().await;
    wizard.select_time(time)?;
    Ok(Json(WizardView::new(id, &wizard)))
}

// POST /api/wizards/:id/details
pub async fn update_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DetailsPatch>,
) -> Result<Json<WizardView>, AppError> {
    let handle = state.wizard(id).await?;
    let mut wizard = handle.lock().await;
    wizard.update_details(&patch)?;
    Ok(Json(WizardView::new(id, &wizard)))
}

// POST /api/wizards/:id/next
pub async fn next_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let handle = state.wizard(id).await?;
    let mut wizard = handle.lock().await;
    wizard.next()?;
    Ok(Json(WizardView::new(id, &wizard)))
}

// POST /api/wizards/:id/back
pub async fn previous_step(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let handle = state.wizard(id).await?;
    let mut wizard = handle.lock().await;
    wizard.back()?;
    Ok(Json(WizardView::new(id, &wizard)))
}

// POST /api/wizards/:id/reset
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let handle = state.wizard(id).await?;
    let mut wizard = handle.lock().await;
    wizard.reset();
    Ok(Json(WizardView::new(id, &wizard)))
}

// POST /api/wizards/:id/confirm
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let handle = state.wizard(id).await?;
    let ticket = handle.lock().await.begin_submission()?;

    // Runs detached so a dropped request still settles the wizard. The
    // wizard stays unlocked meanwhile and the user can keep navigating.
    let task = {
        let state = state.clone();
        let handle = handle.clone();
        tokio::spawn(async move { state.finish_submission(id, handle, ticket).await })
    };
    let mounted = task
        .await
        .map_err(|e| AppError::Internal(format!("submission task failed: {e}")))??;

    if !mounted {
        return Err(AppError::NotFound(format!("booking {id}")));
    }
    let wizard = handle.lock().await;
    Ok(Json(WizardView::new(id, &wizard)))
}
