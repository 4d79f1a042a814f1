use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{ApiError, BookingApi};
use crate::models::{
    AppointmentRequest, BlockedSlot, CreatedAppointment, Service, SessionUser, SigninRequest,
    SignupRequest, WorkingHours,
};

/// Scripted backend that records every mutating call in order.
pub struct MockApi {
    pub services: Vec<Service>,
    pub working_hours: Vec<WorkingHours>,
    pub blocked: Vec<BlockedSlot>,
    pub signup: Result<String, ApiError>,
    pub signin: Result<SessionUser, ApiError>,
    pub create: Result<CreatedAppointment, ApiError>,
    pub calls: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<AppointmentRequest>>,
    pub tokens: Mutex<Vec<Option<String>>>,
    /// Bearer tokens seen by the read endpoints.
    pub read_tokens: Mutex<Vec<Option<String>>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            services: vec![haircut()],
            working_hours: vec![],
            blocked: vec![],
            signup: Ok("User registered successfully!".to_string()),
            signin: Ok(registered_user()),
            create: Ok(CreatedAppointment {
                id: Some(42),
                ..Default::default()
            }),
            calls: Mutex::new(vec![]),
            requests: Mutex::new(vec![]),
            tokens: Mutex::new(vec![]),
            read_tokens: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn haircut() -> Service {
    Service {
        id: 1,
        name: "Haircut".to_string(),
        description: "Wash and cut".to_string(),
        price: 40.0,
        duration_minutes: 30,
    }
}

pub fn registered_user() -> SessionUser {
    SessionUser {
        token: "fresh-token".to_string(),
        roles: vec!["ROLE_CUSTOMER".to_string()],
        first_name: "Anna".to_string(),
        last_name: "Test".to_string(),
        email: "a@test.de".to_string(),
        phone_number: None,
    }
}

#[async_trait]
impl BookingApi for MockApi {
    async fn fetch_services(&self, token: Option<&str>) -> Result<Vec<Service>, ApiError> {
        self.read_tokens.lock().unwrap().push(token.map(str::to_string));
        Ok(self.services.clone())
    }

    async fn fetch_working_hours(&self, token: Option<&str>) -> Result<Vec<WorkingHours>, ApiError> {
        self.read_tokens.lock().unwrap().push(token.map(str::to_string));
        Ok(self.working_hours.clone())
    }

    async fn fetch_blocked_slots(
        &self,
        _date: NaiveDate,
        token: Option<&str>,
    ) -> Result<Vec<BlockedSlot>, ApiError> {
        self.read_tokens.lock().unwrap().push(token.map(str::to_string));
        Ok(self.blocked.clone())
    }

    async fn sign_up(&self, _request: &SignupRequest) -> Result<String, ApiError> {
        self.calls.lock().unwrap().push("signup".to_string());
        self.signup.clone()
    }

    async fn sign_in(&self, _request: &SigninRequest) -> Result<SessionUser, ApiError> {
        self.calls.lock().unwrap().push("signin".to_string());
        self.signin.clone()
    }

    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
        token: Option<&str>,
    ) -> Result<CreatedAppointment, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create {}", request.start_time));
        self.requests.lock().unwrap().push(request.clone());
        self.tokens.lock().unwrap().push(token.map(str::to_string));
        self.create.clone()
    }
}
