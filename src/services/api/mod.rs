pub mod http;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{
    AppointmentRequest, BlockedSlot, CreatedAppointment, Service, SessionUser, SigninRequest,
    SignupRequest, WorkingHours,
};

/// Failures reported by the salon backend or the transport to it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("{}", .messages.join(ERROR_SEPARATOR))]
    Validation { messages: Vec<String> },

    #[error("{0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("backend error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

pub const ERROR_SEPARATOR: &str = "; ";

impl ApiError {
    /// Classifies a non-success response by status code and body shape.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let messages = parsed
            .as_ref()
            .map(error_messages)
            .unwrap_or_else(|| {
                let raw = body.trim();
                if raw.is_empty() {
                    Vec::new()
                } else {
                    vec![raw.to_string()]
                }
            });
        let joined = if messages.is_empty() {
            format!("request failed with status {status}")
        } else {
            messages.join(ERROR_SEPARATOR)
        };

        match status {
            409 => ApiError::Conflict(joined),
            401 | 403 => ApiError::Unauthorized(joined),
            400 | 422 if looks_like_duplicate(&joined) => ApiError::Conflict(joined),
            400 | 422 if !messages.is_empty() => ApiError::Validation { messages },
            _ => ApiError::Http {
                status,
                message: joined,
            },
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

/// Flattens both backend error shapes, `{"message": ".."}` and
/// `{"errors": [..]}`, into a list of readable fragments. Order is preserved.
pub fn error_messages(body: &Value) -> Vec<String> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let messages: Vec<String> = errors.iter().filter_map(field_error_text).collect();
        if !messages.is_empty() {
            return messages;
        }
    }

    for key in ["message", "error"] {
        if let Some(msg) = body.get(key).and_then(Value::as_str) {
            if !msg.trim().is_empty() {
                return vec![msg.trim().to_string()];
            }
        }
    }

    match body.as_str() {
        Some(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn field_error_text(entry: &Value) -> Option<String> {
    if let Some(s) = entry.as_str() {
        return Some(s.to_string());
    }
    let message = entry
        .get("defaultMessage")
        .or_else(|| entry.get("message"))
        .and_then(Value::as_str)?;
    match entry.get("field").and_then(Value::as_str) {
        Some(field) => Some(format!("{field}: {message}")),
        None => Some(message.to_string()),
    }
}

fn looks_like_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already") || lower.contains("duplicate") || lower.contains("exists")
}

/// The REST backend as seen by the booking flow.
///
/// `token` is the signed-in customer's bearer token, if any.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn fetch_services(&self, token: Option<&str>) -> Result<Vec<Service>, ApiError>;

    async fn fetch_working_hours(&self, token: Option<&str>) -> Result<Vec<WorkingHours>, ApiError>;

    async fn fetch_blocked_slots(
        &self,
        date: NaiveDate,
        token: Option<&str>,
    ) -> Result<Vec<BlockedSlot>, ApiError>;

    /// Returns the backend's confirmation message.
    async fn sign_up(&self, request: &SignupRequest) -> Result<String, ApiError>;

    async fn sign_in(&self, request: &SigninRequest) -> Result<SessionUser, ApiError>;

    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
        token: Option<&str>,
    ) -> Result<CreatedAppointment, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_errors_list_joined_in_order() {
        let err = ApiError::from_response(422, r#"{"errors":["email required","date invalid"]}"#);
        let msg = err.to_string();
        assert_eq!(msg, "email required; date invalid");
        assert!(msg.find("email required").unwrap() < msg.find("date invalid").unwrap());
    }

    #[test]
    fn test_single_message() {
        let body = json!({"message": "Error: Email is already in use!"});
        assert_eq!(error_messages(&body), vec!["Error: Email is already in use!".to_string()]);
    }

    #[test]
    fn test_field_error_objects() {
        let body = json!({"errors": [
            {"field": "email", "defaultMessage": "must be a well-formed email address"},
            {"message": "phone too long"}
        ]});
        assert_eq!(
            error_messages(&body),
            vec![
                "email: must be a well-formed email address".to_string(),
                "phone too long".to_string()
            ]
        );
    }

    #[test]
    fn test_empty_body_has_no_message() {
        assert!(error_messages(&json!({})).is_empty());
        assert!(matches!(
            ApiError::from_response(400, "{}"),
            ApiError::Http { status: 400, message } if message == "request failed with status 400"
        ));
    }

    #[test]
    fn test_from_response_validation() {
        let err = ApiError::from_response(400, r#"{"errors":["email required","date invalid"]}"#);
        assert_eq!(
            err,
            ApiError::Validation {
                messages: vec!["email required".to_string(), "date invalid".to_string()]
            }
        );
        assert_eq!(err.to_string(), "email required; date invalid");
    }

    #[test]
    fn test_from_response_duplicate_is_conflict() {
        let err = ApiError::from_response(400, r#"{"message":"Error: Email is already in use!"}"#);
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_from_response_status_mapping() {
        assert!(matches!(
            ApiError::from_response(409, "slot taken"),
            ApiError::Conflict(m) if m == "slot taken"
        ));
        assert!(matches!(
            ApiError::from_response(401, ""),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from_response(500, "<html>oops</html>"),
            ApiError::Http { status: 500, .. }
        ));
    }
}
