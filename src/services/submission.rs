use std::sync::Arc;

use serde::Serialize;

use crate::models::{
    AppointmentCustomer, AppointmentRequest, BookingDraft, CreatedAppointment, ServiceRef,
    SessionUser, SigninRequest, SignupRequest, SubmissionOutcome,
};
use crate::services::api::{ApiError, BookingApi};

const NETWORK_FAILURE: &str =
    "Could not reach the booking service. Please check your connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Registration,
    Booking,
}

/// Everything a submission attempt produced, not just its outcome.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub outcome: SubmissionOutcome,
    pub failed_stage: Option<FailedStage>,
    pub account_created: bool,
    /// Set when a freshly registered guest was signed in automatically.
    pub signed_in: Option<SessionUser>,
    pub appointment: Option<CreatedAppointment>,
}

impl SubmissionReport {
    fn failed(stage: FailedStage, message: String, account_created: bool, signed_in: Option<SessionUser>) -> Self {
        Self {
            outcome: SubmissionOutcome::error(message),
            failed_stage: Some(stage),
            account_created,
            signed_in,
            appointment: None,
        }
    }
}

/// Runs the network side of a booking: optional guest registration and
/// sign-in, then the appointment itself. Steps run strictly in order and
/// the appointment request is never retried here.
pub struct BookingSubmissionService {
    api: Arc<dyn BookingApi>,
}

impl BookingSubmissionService {
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self { api }
    }

    pub async fn submit(
        &self,
        draft: &BookingDraft,
        session_user: Option<&SessionUser>,
    ) -> SubmissionReport {
        let request = match build_appointment_request(draft) {
            Some(request) => request,
            None => {
                return SubmissionReport::failed(
                    FailedStage::Booking,
                    "Please choose a service, date and time before confirming.".to_string(),
                    false,
                    None,
                );
            }
        };

        let details = &draft.customer_details;
        let mut notes: Vec<&str> = Vec::new();
        let mut account_created = false;
        let mut signed_in: Option<SessionUser> = None;

        // 1. Guest registration and automatic sign-in
        let password = details.password.as_deref().filter(|p| !p.is_empty());
        if let (None, Some(password)) = (session_user, password) {
            let signup = SignupRequest {
                username: details.email.clone(),
                email: details.email.clone(),
                password: password.to_string(),
                first_name: details.first_name.clone(),
                last_name: details.last_name.clone(),
                phone_number: details.phone_number.clone(),
            };

            if let Err(e) = self.api.sign_up(&signup).await {
                tracing::warn!(error = %e, email = %details.email, "guest registration failed");
                return SubmissionReport::failed(
                    FailedStage::Registration,
                    registration_failure_message(&e),
                    false,
                    None,
                );
            }
            account_created = true;
            tracing::info!(email = %details.email, "guest account created");

            let signin = SigninRequest {
                username: details.email.clone(),
                password: password.to_string(),
            };
            match self.api.sign_in(&signin).await {
                Ok(user) => {
                    notes.push("Your account has been created and you are now signed in.");
                    signed_in = Some(user);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "automatic sign-in after registration did not succeed");
                    notes.push(
                        "Your account has been created, but automatic sign-in did not work. \
                         You can sign in manually at any time.",
                    );
                }
            }
        }

        // 2. The appointment itself
        let token = session_user
            .or(signed_in.as_ref())
            .map(|u| u.token.as_str());

        match self.api.create_appointment(&request, token).await {
            Ok(appointment) => {
                tracing::info!(
                    appointment_id = ?appointment.id,
                    start_time = %request.start_time,
                    "appointment booked"
                );
                notes.push("Your appointment has been booked successfully.");
                SubmissionReport {
                    outcome: SubmissionOutcome::success(notes.join(" ")),
                    failed_stage: None,
                    account_created,
                    signed_in,
                    appointment: Some(appointment),
                }
            }
            Err(e) => {
                if e.is_network() {
                    tracing::error!(error = %e, "appointment request did not reach the backend");
                } else {
                    tracing::warn!(error = %e, "appointment rejected");
                }
                SubmissionReport::failed(
                    FailedStage::Booking,
                    booking_failure_message(&e, account_created),
                    account_created,
                    signed_in,
                )
            }
        }
    }
}

/// Wire payload for `POST /appointments`, or `None` when the draft is
/// missing its service, date or time.
pub fn build_appointment_request(draft: &BookingDraft) -> Option<AppointmentRequest> {
    let service = draft.selected_service.as_ref()?;
    let start = draft.selected_date?.and_time(draft.selected_time?);
    let details = &draft.customer_details;

    Some(AppointmentRequest {
        start_time: start.format("%Y-%m-%dT%H:%M:%S").to_string(),
        service: ServiceRef { id: service.id },
        customer: AppointmentCustomer {
            first_name: details.first_name.clone(),
            last_name: details.last_name.clone(),
            email: details.email.clone(),
            phone_number: details.phone_number.clone(),
        },
        notes: details.notes.clone(),
    })
}

fn registration_failure_message(e: &ApiError) -> String {
    match e {
        ApiError::Conflict(_) => format!(
            "An account with this email already exists. Please sign in instead, \
             or continue as a guest without creating an account. ({e})"
        ),
        ApiError::Network(_) => format!("{NETWORK_FAILURE} ({e})"),
        other => format!("Your account could not be created: {other}"),
    }
}

fn booking_failure_message(e: &ApiError, account_created: bool) -> String {
    let reason = match e {
        ApiError::Conflict(msg) if is_identity_conflict(msg) => {
            if account_created {
                "Please sign in with your new account and try booking again.".to_string()
            } else {
                "An account with this email already exists. Please sign in to book with your account."
                    .to_string()
            }
        }
        ApiError::Conflict(_) => {
            "This time slot is no longer available. Please go back and choose another time."
                .to_string()
        }
        ApiError::Validation { .. } => {
            format!("Please check your booking details and try again: {e}")
        }
        ApiError::Unauthorized(_) => {
            "Your session is no longer valid. Please sign in again and retry.".to_string()
        }
        ApiError::Network(_) => NETWORK_FAILURE.to_string(),
        ApiError::Http { .. } | ApiError::Decode(_) => {
            format!("The booking could not be completed ({e}). Please try again.")
        }
    };

    if account_created {
        format!("Your account was created, but the appointment itself could not be booked. {reason}")
    } else {
        reason
    }
}

fn is_identity_conflict(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["email", "account", "registered"]
        .iter()
        .any(|needle| lower.contains(needle))
}
