use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::Service;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    SelectService,
    SelectDateTime,
    EnterDetails,
    Confirm,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::SelectService => "select_service",
            StepId::SelectDateTime => "select_date_time",
            StepId::EnterDetails => "enter_details",
            StepId::Confirm => "confirm",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    Authenticated,
    Guest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    /// Only set for guests creating an account alongside the booking.
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

/// Partial update of the details form. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailsPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub password: Option<String>,
    pub create_account: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionOutcome {
    pub status: OutcomeStatus,
    pub message: Option<String>,
}

impl SubmissionOutcome {
    pub fn pending() -> Self {
        Self {
            status: OutcomeStatus::Pending,
            message: None,
        }
    }

    pub fn success(message: String) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message: Some(message),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            status: OutcomeStatus::Error,
            message: Some(message),
        }
    }
}

/// Working state of one booking attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub selected_service: Option<Service>,
    pub selected_date: Option<NaiveDate>,
    pub selected_time: Option<NaiveTime>,
    pub customer_details: CustomerDetails,
    pub current_step: StepId,
    pub submission_outcome: Option<SubmissionOutcome>,
}

impl BookingDraft {
    pub fn empty() -> Self {
        Self {
            selected_service: None,
            selected_date: None,
            selected_time: None,
            customer_details: CustomerDetails::default(),
            current_step: StepId::SelectService,
            submission_outcome: None,
        }
    }

    pub fn is_booked(&self) -> bool {
        matches!(
            self.submission_outcome,
            Some(SubmissionOutcome {
                status: OutcomeStatus::Success,
                ..
            })
        )
    }
}
