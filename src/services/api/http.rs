use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use super::{ApiError, BookingApi};
use crate::models::{
    AppointmentRequest, BlockedSlot, CreatedAppointment, Service, SessionUser, SigninRequest,
    SignupRequest, WorkingHours,
};

/// `BookingApi` over the salon backend's REST endpoints.
pub struct HttpBookingApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBookingApi {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str, token: Option<&str>) -> reqwest::RequestBuilder {
        with_token(self.client.get(self.url(path)), token)
    }
}

fn with_token(builder: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(ApiError::from_response(status.as_u16(), &text));
    }

    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn fetch_services(&self, token: Option<&str>) -> Result<Vec<Service>, ApiError> {
        let resp = self.get("/services", token).send().await?;
        read_json(resp).await
    }

    async fn fetch_working_hours(&self, token: Option<&str>) -> Result<Vec<WorkingHours>, ApiError> {
        let resp = self.get("/working-hours", token).send().await?;
        read_json(resp).await
    }

    async fn fetch_blocked_slots(
        &self,
        date: NaiveDate,
        token: Option<&str>,
    ) -> Result<Vec<BlockedSlot>, ApiError> {
        let resp = self
            .get("/blocked-slots", token)
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await?;
        read_json(resp).await
    }

    async fn sign_up(&self, request: &SignupRequest) -> Result<String, ApiError> {
        tracing::debug!(email = %request.email, "registering guest account");

        let resp = self
            .client
            .post(self.url("/auth/signup"))
            .json(request)
            .send()
            .await?;
        let data: serde_json::Value = read_json(resp).await?;

        Ok(data["message"]
            .as_str()
            .unwrap_or("User registered successfully")
            .to_string())
    }

    async fn sign_in(&self, request: &SigninRequest) -> Result<SessionUser, ApiError> {
        let resp = self
            .client
            .post(self.url("/auth/signin"))
            .json(request)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
        token: Option<&str>,
    ) -> Result<CreatedAppointment, ApiError> {
        tracing::debug!(
            start_time = %request.start_time,
            service_id = request.service.id,
            "creating appointment"
        );

        let builder = self.client.post(self.url("/appointments")).json(request);
        let resp = with_token(builder, token).send().await?;
        read_json(resp).await
    }
}
