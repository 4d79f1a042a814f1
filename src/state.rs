use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::{AppConfig, AvailabilitySource};
use crate::errors::AppError;
use crate::models::{Service, SessionUser};
use crate::services::api::BookingApi;
use crate::services::availability::{AvailabilityProvider, BackendAvailability, StaticAvailability};
use crate::services::catalog::ServiceCatalog;
use crate::services::clock::Clock;
use crate::services::session::SessionContext;
use crate::services::submission::BookingSubmissionService;
use crate::services::wizard::{BookingWizard, SubmissionTicket};

pub type WizardHandle = Arc<tokio::sync::Mutex<BookingWizard>>;

struct MountedWizard {
    handle: WizardHandle,
    last_seen: Instant,
}

pub struct AppState {
    pub config: AppConfig,
    pub api: Arc<dyn BookingApi>,
    pub availability: Arc<dyn AvailabilityProvider>,
    pub clock: Arc<dyn Clock>,
    pub session: SessionContext,
    pub submission: BookingSubmissionService,
    pub catalog: RwLock<ServiceCatalog>,
    wizards: RwLock<HashMap<Uuid, MountedWizard>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<Mutex<Connection>>,
        api: Arc<dyn BookingApi>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let availability: Arc<dyn AvailabilityProvider> = match config.availability_source {
            AvailabilitySource::Backend => {
                tracing::info!("using backend working hours for availability");
                Arc::new(BackendAvailability::new(api.clone()))
            }
            AvailabilitySource::Static => {
                tracing::info!(
                    hours = %config.business_hours.to_human_readable(),
                    "using static business hours for availability"
                );
                Arc::new(StaticAvailability::new(config.business_hours.clone()))
            }
        };

        Ok(Self {
            session: SessionContext::load(store)?,
            submission: BookingSubmissionService::new(api.clone()),
            catalog: RwLock::new(ServiceCatalog::default()),
            wizards: RwLock::new(HashMap::new()),
            config,
            api,
            availability,
            clock,
        })
    }

    pub fn new_wizard(&self) -> BookingWizard {
        BookingWizard::new(
            self.availability.clone(),
            self.clock.clone(),
            self.session.current(),
        )
    }

    pub async fn mount_wizard(&self, id: Uuid, wizard: BookingWizard) {
        self.wizards.write().await.insert(
            id,
            MountedWizard {
                handle: Arc::new(tokio::sync::Mutex::new(wizard)),
                last_seen: Instant::now(),
            },
        );
    }

    /// Looks up a mounted wizard and marks it as recently used.
    pub async fn wizard(&self, id: Uuid) -> Result<WizardHandle, AppError> {
        let mut wizards = self.wizards.write().await;
        let mounted = wizards
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
        mounted.last_seen = Instant::now();
        Ok(mounted.handle.clone())
    }

    pub async fn unmount_wizard(&self, id: Uuid) -> Result<(), AppError> {
        self.wizards
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
    }

    /// True while `handle` is still the wizard mounted under `id`.
    pub async fn is_mounted(&self, id: Uuid, handle: &WizardHandle) -> bool {
        self.wizards
            .read()
            .await
            .get(&id)
            .is_some_and(|mounted| Arc::ptr_eq(&mounted.handle, handle))
    }

    pub async fn wizard_count(&self) -> usize {
        self.wizards.read().await.len()
    }

    /// Drops wizards untouched for at least `max_idle`. Wizards with a
    /// submission in flight are kept.
    pub async fn evict_idle_wizards(&self, max_idle: Duration) -> usize {
        let mut wizards = self.wizards.write().await;
        let before = wizards.len();
        wizards.retain(|id, mounted| {
            if mounted.last_seen.elapsed() < max_idle {
                return true;
            }
            let busy = match mounted.handle.try_lock() {
                Ok(wizard) => wizard.is_submitting(),
                Err(_) => true,
            };
            if !busy {
                tracing::debug!(wizard = %id, "evicting idle booking");
            }
            busy
        });
        let evicted = before - wizards.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = wizards.len(), "evicted idle bookings");
        }
        evicted
    }

    /// Runs a started submission to the end and applies the result if the
    /// wizard is still mounted. Returns whether it was. A new account's
    /// sign-in is kept either way.
    pub async fn finish_submission(
        &self,
        id: Uuid,
        handle: WizardHandle,
        ticket: SubmissionTicket,
    ) -> Result<bool, AppError> {
        let report = self
            .submission
            .submit(&ticket.draft, ticket.session_user.as_ref())
            .await;

        let mounted = self.is_mounted(id, &handle).await;
        if mounted {
            handle.lock().await.complete_submission(&ticket, &report);
        } else {
            tracing::warn!(wizard = %id, "booking closed during submission, discarding result");
        }

        if let Some(user) = report.signed_in.clone() {
            self.sign_in(user).await?;
        }
        Ok(mounted)
    }

    /// Reloads the catalog from the backend.
    pub async fn refresh_catalog(&self) -> Result<Vec<Service>, AppError> {
        let token = self.session.current().map(|user| user.token);
        let catalog = ServiceCatalog::load(self.api.as_ref(), token.as_deref()).await?;
        let services = catalog.services().to_vec();
        *self.catalog.write().await = catalog;
        Ok(services)
    }

    pub async fn find_service(&self, id: i64) -> Result<Service, AppError> {
        if let Some(service) = self.catalog.read().await.find(id) {
            return Ok(service.clone());
        }
        self.refresh_catalog()
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("service {id}")))
    }

    pub async fn sign_in(&self, user: SessionUser) -> Result<(), AppError> {
        self.session.sign_in(user.clone())?;
        self.notify_wizards(Some(user)).await;
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.session.sign_out()?;
        self.notify_wizards(None).await;
        Ok(())
    }

    /// Lets every open wizard re-resolve who is booking.
    async fn notify_wizards(&self, user: Option<SessionUser>) {
        let handles: Vec<WizardHandle> = self
            .wizards
            .read()
            .await
            .values()
            .map(|mounted| mounted.handle.clone())
            .collect();
        for handle in handles {
            handle.lock().await.on_session_changed(user.clone());
        }
    }
}
