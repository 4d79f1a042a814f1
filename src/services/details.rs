use std::fmt;

use serde::Serialize;

use crate::models::{CustomerDetails, IdentityMode};

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn form(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add("form", message);
        errors
    }

    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&text)
    }
}

impl std::error::Error for ValidationErrors {}

/// Checks the details step and returns the cleaned-up snapshot that goes
/// into the draft. Guests opting into an account need a password of at
/// least [`MIN_PASSWORD_LENGTH`] characters; everyone else carries none.
pub fn validate_details(
    details: &CustomerDetails,
    mode: IdentityMode,
    create_account: bool,
) -> Result<CustomerDetails, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let first_name = details.first_name.trim().to_string();
    let last_name = details.last_name.trim().to_string();
    let email = details.email.trim().to_string();

    if first_name.is_empty() {
        errors.add("first_name", "First name is required");
    }
    if last_name.is_empty() {
        errors.add("last_name", "Last name is required");
    }
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !is_plausible_email(&email) {
        errors.add("email", "Please enter a valid email address");
    }

    let password = if mode == IdentityMode::Guest && create_account {
        let password = details.password.clone().unwrap_or_default();
        if password.is_empty() {
            errors.add("password", "Password is required to create an account");
        } else if password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            );
        }
        Some(password)
    } else {
        None
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CustomerDetails {
        first_name,
        last_name,
        email,
        phone_number: non_blank(details.phone_number.as_deref()),
        notes: non_blank(details.notes.as_deref()),
        password,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anna() -> CustomerDetails {
        CustomerDetails {
            first_name: " Anna ".to_string(),
            last_name: "Test".to_string(),
            email: "a@test.de".to_string(),
            phone_number: Some("  ".to_string()),
            notes: None,
            password: None,
        }
    }

    #[test]
    fn test_valid_guest_without_account() {
        let validated = validate_details(&anna(), IdentityMode::Guest, false).unwrap();
        assert_eq!(validated.first_name, "Anna");
        assert_eq!(validated.phone_number, None);
        assert_eq!(validated.password, None);
    }

    #[test]
    fn test_required_fields() {
        let err = validate_details(&CustomerDetails::default(), IdentityMode::Guest, false)
            .unwrap_err();
        assert!(err.for_field("first_name").is_some());
        assert!(err.for_field("last_name").is_some());
        assert!(err.for_field("email").is_some());
        assert!(err.for_field("password").is_none());
    }

    #[test]
    fn test_blank_names_rejected() {
        let details = CustomerDetails {
            first_name: "   ".to_string(),
            ..anna()
        };
        let err = validate_details(&details, IdentityMode::Guest, false).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "first_name");
    }

    #[test]
    fn test_malformed_email() {
        let details = CustomerDetails {
            email: "not-an-email".to_string(),
            ..anna()
        };
        let err = validate_details(&details, IdentityMode::Guest, false).unwrap_err();
        assert_eq!(err.for_field("email"), Some("Please enter a valid email address"));
    }

    #[test]
    fn test_guest_account_needs_password() {
        let err = validate_details(&anna(), IdentityMode::Guest, true).unwrap_err();
        assert!(err.for_field("password").is_some());

        let short = CustomerDetails {
            password: Some("abc".to_string()),
            ..anna()
        };
        let err = validate_details(&short, IdentityMode::Guest, true).unwrap_err();
        assert_eq!(err.for_field("password"), Some("Password must be at least 6 characters"));

        let ok = CustomerDetails {
            password: Some("abcdef".to_string()),
            ..anna()
        };
        let validated = validate_details(&ok, IdentityMode::Guest, true).unwrap();
        assert_eq!(validated.password.as_deref(), Some("abcdef"));
    }

    #[test]
    fn test_authenticated_never_carries_password() {
        let details = CustomerDetails {
            password: Some("whatever".to_string()),
            ..anna()
        };
        let validated = validate_details(&details, IdentityMode::Authenticated, true).unwrap();
        assert_eq!(validated.password, None);
    }

    #[test]
    fn test_display_joins_fields() {
        let err = validate_details(&CustomerDetails::default(), IdentityMode::Guest, false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "first_name: First name is required; last_name: Last name is required; email: Email is required"
        );
    }
}
