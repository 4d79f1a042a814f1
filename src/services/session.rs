use std::sync::{Arc, Mutex, RwLock};

use anyhow::Context;
use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::db::queries;
use crate::models::SessionUser;

/// Local storage key holding the serialized session user.
pub const SESSION_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn { user: SessionUser },
    SignedOut,
}

/// Who is signed in, persisted to local storage and observable through
/// [`SessionContext::subscribe`].
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Arc<Mutex<Connection>>,
    user: RwLock<Option<SessionUser>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionContext {
    pub fn load(store: Arc<Mutex<Connection>>) -> anyhow::Result<Self> {
        let stored = {
            let conn = store
                .lock()
                .map_err(|_| anyhow::anyhow!("local storage lock poisoned"))?;
            queries::get_item(&conn, SESSION_KEY).context("failed to read session")?
        };

        let user = match stored {
            Some(json) => match serde_json::from_str::<SessionUser>(&json) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable stored session");
                    None
                }
            },
            None => None,
        };

        if let Some(user) = &user {
            tracing::info!(email = %user.email, "restored session");
        }

        let (events, _) = broadcast::channel(64);
        Ok(Self {
            inner: Arc::new(SessionInner {
                store,
                user: RwLock::new(user),
                events,
            }),
        })
    }

    pub fn current(&self) -> Option<SessionUser> {
        match self.inner.user.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn sign_in(&self, user: SessionUser) -> anyhow::Result<()> {
        let json = serde_json::to_string(&user)?;
        {
            let conn = self
                .inner
                .store
                .lock()
                .map_err(|_| anyhow::anyhow!("local storage lock poisoned"))?;
            queries::set_item(&conn, SESSION_KEY, &json).context("failed to persist session")?;
        }
        self.replace(Some(user.clone()));

        tracing::info!(email = %user.email, "signed in");
        // No receivers is fine
        let _ = self.inner.events.send(SessionEvent::SignedIn { user });
        Ok(())
    }

    pub fn sign_out(&self) -> anyhow::Result<()> {
        {
            let conn = self
                .inner
                .store
                .lock()
                .map_err(|_| anyhow::anyhow!("local storage lock poisoned"))?;
            queries::remove_item(&conn, SESSION_KEY).context("failed to clear session")?;
        }
        let previous = self.replace(None);

        if previous.is_some() {
            tracing::info!("signed out");
            let _ = self.inner.events.send(SessionEvent::SignedOut);
        }
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn replace(&self, user: Option<SessionUser>) -> Option<SessionUser> {
        let mut guard = match self.inner.user.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, user)
    }
}
