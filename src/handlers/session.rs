use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::errors::AppError;
use crate::models::{SessionUser, SigninRequest};
use crate::services::session::SessionEvent;
use crate::state::AppState;

/// Session as shown to clients; the bearer token never leaves the process.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub roles: Vec<String>,
}

impl From<&SessionUser> for UserView {
    fn from(user: &SessionUser) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            roles: user.roles.clone(),
        }
    }
}

impl SessionView {
    fn from_user(user: Option<&SessionUser>) -> Self {
        Self {
            authenticated: user.is_some(),
            user: user.map(UserView::from),
        }
    }
}

// GET /api/session
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(SessionView::from_user(state.session.current().as_ref()))
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

// POST /api/session/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<SessionView>, AppError> {
    let request = SigninRequest {
        username: payload.username.trim().to_string(),
        password: payload.password,
    };
    let user = state.api.sign_in(&request).await?;
    state.sign_in(user.clone()).await?;
    Ok(Json(SessionView::from_user(Some(&user))))
}

// POST /api/session/logout
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<Json<SessionView>, AppError> {
    state.sign_out().await?;
    Ok(Json(SessionView::from_user(None)))
}

// GET /api/session/events
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.session.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let view = match &event {
                SessionEvent::SignedIn { user } => SessionView::from_user(Some(user)),
                SessionEvent::SignedOut => SessionView::from_user(None),
            };
            let data = serde_json::to_string(&view).unwrap_or_default();
            let name = match event {
                SessionEvent::SignedIn { .. } => "signed_in",
                SessionEvent::SignedOut => "signed_out",
            };
            Some(Ok(Event::default().event(name).data(data)))
        }
        // Lagged receivers just skip missed events
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
