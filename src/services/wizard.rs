use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use crate::models::{
    BookingDraft, DetailsPatch, IdentityMode, OutcomeStatus, Service, SessionUser, StepId,
    SubmissionOutcome,
};
use crate::services::availability::AvailabilityProvider;
use crate::services::calendar;
use crate::services::clock::Clock;
use crate::services::details::{validate_details, ValidationErrors};
use crate::services::identity::{self, ResolvedIdentity};
use crate::services::submission::{BookingSubmissionService, FailedStage, SubmissionReport};

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("not available at step {}", .0.as_str())]
    WrongStep(StepId),

    #[error("Please select a service first")]
    MissingService,

    #[error("Please select a date and a time")]
    MissingDateTime,

    #[error("{0} is in the past")]
    DateInPast(NaiveDate),

    #[error("{} is not an available time", .0.format("%H:%M"))]
    SlotUnavailable(NaiveTime),

    #[error("The selected time has already passed. Please choose another time")]
    SlotExpired,

    #[error("A booking request is already being processed")]
    SubmissionInProgress,

    #[error("This appointment is already booked")]
    AlreadyBooked,

    #[error("Could not load available times: {0}")]
    Availability(String),
}

/// Snapshot handed out when a submission starts. Results are only applied
/// back to the wizard generation that issued the ticket.
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    generation: u64,
    pub draft: BookingDraft,
    pub session_user: Option<SessionUser>,
}

/// State machine for one booking attempt:
/// `SelectService → SelectDateTime → [EnterDetails] → Confirm`.
/// Signed-in customers skip `EnterDetails`.
pub struct BookingWizard {
    draft: BookingDraft,
    availability: Arc<dyn AvailabilityProvider>,
    clock: Arc<dyn Clock>,
    session_user: Option<SessionUser>,
    identity_mode: IdentityMode,
    create_account: bool,
    details_confirmed: bool,
    slots: Vec<NaiveTime>,
    slots_for: Option<(i64, NaiveDate)>,
    submitting: bool,
    generation: u64,
}

impl BookingWizard {
    pub fn new(
        availability: Arc<dyn AvailabilityProvider>,
        clock: Arc<dyn Clock>,
        session_user: Option<SessionUser>,
    ) -> Self {
        let mut wizard = Self {
            draft: BookingDraft::empty(),
            availability,
            clock,
            session_user,
            identity_mode: IdentityMode::Guest,
            create_account: false,
            details_confirmed: false,
            slots: Vec::new(),
            slots_for: None,
            submitting: false,
            generation: 0,
        };
        wizard.apply_identity(identity::resolve(wizard.session_user.as_ref(), None, None));
        wizard
    }

    /// Deep-link entry: the service is already chosen, so the wizard opens
    /// on the date/time step.
    pub fn with_service(mut self, service: Service) -> Self {
        self.draft.selected_service = Some(service);
        self.draft.current_step = StepId::SelectDateTime;
        self
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn current_step(&self) -> StepId {
        self.draft.current_step
    }

    pub fn slots(&self) -> &[NaiveTime] {
        &self.slots
    }

    pub fn identity_mode(&self) -> IdentityMode {
        self.identity_mode
    }

    pub fn identity_locked(&self) -> bool {
        self.identity_mode == IdentityMode::Authenticated
    }

    pub fn create_account(&self) -> bool {
        self.create_account
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn session_user(&self) -> Option<&SessionUser> {
        self.session_user.as_ref()
    }

    /// Steps shown to the user. Identifiers stay stable; only the visible
    /// numbering changes when the details step is skipped.
    pub fn visible_steps(&self) -> Vec<StepId> {
        match self.identity_mode {
            IdentityMode::Authenticated => {
                vec![StepId::SelectService, StepId::SelectDateTime, StepId::Confirm]
            }
            IdentityMode::Guest => vec![
                StepId::SelectService,
                StepId::SelectDateTime,
                StepId::EnterDetails,
                StepId::Confirm,
            ],
        }
    }

    /// 1-based position of `step` in the visible step list.
    pub fn step_number(&self, step: StepId) -> Option<usize> {
        self.visible_steps()
            .iter()
            .position(|s| *s == step)
            .map(|i| i + 1)
    }

    pub fn select_service(&mut self, service: Service) -> Result<(), WizardError> {
        self.ensure_editable()?;
        self.ensure_step(&[StepId::SelectService, StepId::SelectDateTime])?;

        tracing::debug!(service_id = service.id, "service selected");
        self.draft.selected_service = Some(service);
        self.clear_date_time();
        Ok(())
    }

    pub async fn select_date(&mut self, date: NaiveDate) -> Result<&[NaiveTime], WizardError> {
        self.ensure_editable()?;
        self.ensure_step(&[StepId::SelectDateTime])?;
        if self.draft.selected_service.is_none() {
            return Err(WizardError::MissingService);
        }
        if date < self.clock.today() {
            return Err(WizardError::DateInPast(date));
        }

        self.draft.selected_date = Some(date);
        self.draft.selected_time = None;
        self.recompute_slots().await?;
        Ok(&self.slots)
    }

    /// Recomputes slots for the current service and date, e.g. after enough
    /// wall-clock time passed to move the "past" cutoff. A chosen time that
    /// dropped out of the new set is cleared.
    pub async fn refresh_slots(&mut self) -> Result<&[NaiveTime], WizardError> {
        if self.draft.selected_service.is_some() && self.draft.selected_date.is_some() {
            self.recompute_slots().await?;
            if let Some(time) = self.draft.selected_time {
                if !self.slots.contains(&time) {
                    tracing::info!(time = %time, "selected time no longer available");
                    self.draft.selected_time = None;
                }
            }
        }
        Ok(&self.slots)
    }

    pub fn select_time(&mut self, time: NaiveTime) -> Result<(), WizardError> {
        self.ensure_editable()?;
        self.ensure_step(&[StepId::SelectDateTime])?;
        let service_id = self
            .draft
            .selected_service
            .as_ref()
            .map(|s| s.id)
            .ok_or(WizardError::MissingService)?;
        let date = self.draft.selected_date.ok_or(WizardError::MissingDateTime)?;

        if self.slots_for != Some((service_id, date)) || !self.slots.contains(&time) {
            return Err(WizardError::SlotUnavailable(time));
        }
        self.draft.selected_time = Some(time);
        Ok(())
    }

    /// Edits the details form. On the confirm step only the notes can change.
    pub fn update_details(&mut self, patch: &DetailsPatch) -> Result<(), WizardError> {
        self.ensure_editable()?;
        match self.draft.current_step {
            StepId::EnterDetails => {
                identity::apply_patch(&mut self.draft.customer_details, patch, self.identity_mode);
                if self.identity_mode == IdentityMode::Guest {
                    if let Some(create_account) = patch.create_account {
                        self.create_account = create_account;
                    }
                }
                self.details_confirmed = false;
            }
            StepId::Confirm => {
                let notes_only = DetailsPatch {
                    notes: patch.notes.clone(),
                    ..Default::default()
                };
                identity::apply_patch(
                    &mut self.draft.customer_details,
                    &notes_only,
                    IdentityMode::Authenticated,
                );
            }
            other => return Err(WizardError::WrongStep(other)),
        }
        Ok(())
    }

    /// Advances one step if the current step's guard holds.
    pub fn next(&mut self) -> Result<StepId, WizardError> {
        if self.draft.is_booked() {
            return Err(WizardError::AlreadyBooked);
        }

        let from = self.draft.current_step;
        let to = match from {
            StepId::SelectService => {
                if self.draft.selected_service.is_none() {
                    return Err(WizardError::MissingService);
                }
                self.clear_date_time();
                StepId::SelectDateTime
            }
            StepId::SelectDateTime => {
                let time = match (self.draft.selected_date, self.draft.selected_time) {
                    (Some(_), Some(time)) => time,
                    _ => return Err(WizardError::MissingDateTime),
                };
                if !self.slots.contains(&time) {
                    return Err(WizardError::SlotUnavailable(time));
                }
                match self.identity_mode {
                    IdentityMode::Authenticated => {
                        self.details_confirmed = true;
                        StepId::Confirm
                    }
                    IdentityMode::Guest => StepId::EnterDetails,
                }
            }
            StepId::EnterDetails => {
                let validated = validate_details(
                    &self.draft.customer_details,
                    self.identity_mode,
                    self.create_account,
                )?;
                self.draft.customer_details = validated;
                self.details_confirmed = true;
                StepId::Confirm
            }
            StepId::Confirm => return Err(WizardError::WrongStep(StepId::Confirm)),
        };

        tracing::info!(from = from.as_str(), to = to.as_str(), "wizard step");
        self.draft.current_step = to;
        Ok(to)
    }

    pub fn back(&mut self) -> Result<StepId, WizardError> {
        let from = self.draft.current_step;
        let to = match from {
            StepId::SelectService => return Err(WizardError::WrongStep(from)),
            StepId::SelectDateTime => StepId::SelectService,
            StepId::EnterDetails => StepId::SelectDateTime,
            StepId::Confirm => {
                if self.draft.is_booked() {
                    return Err(WizardError::AlreadyBooked);
                }
                self.clear_submission_error();
                match self.identity_mode {
                    IdentityMode::Authenticated => StepId::SelectDateTime,
                    IdentityMode::Guest => StepId::EnterDetails,
                }
            }
        };

        tracing::info!(from = from.as_str(), to = to.as_str(), "wizard step back");
        self.draft.current_step = to;
        Ok(to)
    }

    /// Discards the whole draft and starts over. Any in-flight submission
    /// result will be ignored.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.draft = BookingDraft::empty();
        self.slots.clear();
        self.slots_for = None;
        self.submitting = false;
        self.create_account = false;
        self.details_confirmed = false;
        self.apply_identity(identity::resolve(self.session_user.as_ref(), None, None));
        tracing::info!(generation = self.generation, "wizard reset");
    }

    /// Re-resolves identity after a sign-in or sign-out, keeping notes.
    pub fn on_session_changed(&mut self, user: Option<SessionUser>) {
        let was_authenticated = self.session_user.is_some();
        self.session_user = user;

        if self.draft.is_booked() {
            return;
        }

        let resolved = identity::resolve(
            self.session_user.as_ref(),
            None,
            Some(&self.draft.customer_details),
        );
        self.apply_identity(resolved);

        if self.submitting {
            return;
        }

        match (was_authenticated, self.identity_mode, self.draft.current_step) {
            (false, IdentityMode::Authenticated, StepId::EnterDetails) => {
                self.details_confirmed = true;
                self.draft.current_step = StepId::Confirm;
            }
            (true, IdentityMode::Guest, StepId::Confirm) => {
                self.details_confirmed = false;
                self.clear_submission_error();
                self.draft.current_step = StepId::EnterDetails;
            }
            _ => {}
        }
    }

    /// Starts a submission: checks the confirm-step guards, marks the
    /// wizard as submitting and clears any previous message.
    pub fn begin_submission(&mut self) -> Result<SubmissionTicket, WizardError> {
        if self.draft.is_booked() {
            return Err(WizardError::AlreadyBooked);
        }
        if self.submitting {
            return Err(WizardError::SubmissionInProgress);
        }
        self.ensure_step(&[StepId::Confirm])?;

        if self.draft.selected_service.is_none() {
            return Err(WizardError::MissingService);
        }
        let (date, time) = match (self.draft.selected_date, self.draft.selected_time) {
            (Some(date), Some(time)) => (date, time),
            _ => return Err(WizardError::MissingDateTime),
        };
        if !self.details_confirmed {
            return Err(ValidationErrors::form("Please complete your details first").into());
        }
        if date.and_time(time) <= self.clock.now() {
            return Err(WizardError::SlotExpired);
        }

        self.submitting = true;
        self.draft.submission_outcome = Some(SubmissionOutcome::pending());

        Ok(SubmissionTicket {
            generation: self.generation,
            draft: self.draft.clone(),
            session_user: self.session_user.clone(),
        })
    }

    /// Applies a finished submission. Returns `false` when the ticket
    /// belongs to a draft that has since been reset.
    pub fn complete_submission(&mut self, ticket: &SubmissionTicket, report: &SubmissionReport) -> bool {
        if ticket.generation != self.generation {
            tracing::warn!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding result for a reset booking"
            );
            return false;
        }

        self.submitting = false;
        self.draft.submission_outcome = Some(report.outcome.clone());

        if report.account_created {
            // The account exists now; a retry must not register again
            self.draft.customer_details.password = None;
            self.create_account = false;
        }

        match report.failed_stage {
            None => self.draft.current_step = StepId::Confirm,
            Some(FailedStage::Registration) => {
                self.details_confirmed = false;
                self.draft.current_step = StepId::EnterDetails;
            }
            Some(FailedStage::Booking) => {}
        }
        true
    }

    /// Runs a whole submission against `service` in one go.
    pub async fn confirm(
        &mut self,
        service: &BookingSubmissionService,
    ) -> Result<SubmissionReport, WizardError> {
        let ticket = self.begin_submission()?;
        let report = service.submit(&ticket.draft, ticket.session_user.as_ref()).await;
        self.complete_submission(&ticket, &report);
        Ok(report)
    }

    /// `(filename, ics)` for a booked appointment.
    pub fn calendar_export(&self) -> Option<(String, String)> {
        if !self.draft.is_booked() {
            return None;
        }
        let service = self.draft.selected_service.as_ref()?;
        let ics = calendar::format_ics(
            service,
            self.draft.selected_date?,
            self.draft.selected_time?,
            self.draft.customer_details.notes.as_deref(),
        );
        Some((calendar::ics_filename(service), ics))
    }

    fn apply_identity(&mut self, resolved: ResolvedIdentity) {
        if resolved.is_locked() {
            self.create_account = false;
        }
        self.identity_mode = resolved.mode;
        self.draft.customer_details = resolved.details;
        self.details_confirmed = self.identity_mode == IdentityMode::Authenticated;
    }

    async fn recompute_slots(&mut self) -> Result<(), WizardError> {
        let (service_id, duration, date) = match (&self.draft.selected_service, self.draft.selected_date) {
            (Some(service), Some(date)) => (service.id, service.duration_minutes, date),
            _ => return Ok(()),
        };

        self.slots.clear();
        self.slots_for = None;

        let token = self.session_user.as_ref().map(|u| u.token.as_str());
        let slots = self
            .availability
            .slots(date, duration, self.clock.now(), token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, %date, "availability lookup failed");
                WizardError::Availability(format!("{e:#}"))
            })?;

        tracing::debug!(%date, service_id, count = slots.len(), "slots computed");
        self.slots = slots;
        self.slots_for = Some((service_id, date));
        Ok(())
    }

    fn clear_date_time(&mut self) {
        self.draft.selected_date = None;
        self.draft.selected_time = None;
        self.slots.clear();
        self.slots_for = None;
    }

    fn clear_submission_error(&mut self) {
        if matches!(
            self.draft.submission_outcome,
            Some(SubmissionOutcome {
                status: OutcomeStatus::Error,
                ..
            })
        ) {
            self.draft.submission_outcome = None;
        }
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        if self.draft.is_booked() {
            return Err(WizardError::AlreadyBooked);
        }
        if self.submitting {
            return Err(WizardError::SubmissionInProgress);
        }
        Ok(())
    }

    fn ensure_step(&self, allowed: &[StepId]) -> Result<(), WizardError> {
        if allowed.contains(&self.draft.current_step) {
            Ok(())
        } else {
            Err(WizardError::WrongStep(self.draft.current_step))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusinessHours;
    use crate::services::api::mock::{haircut, registered_user, MockApi};
    use crate::services::api::ApiError;
    use crate::services::availability::StaticAvailability;
    use crate::services::clock::FixedClock;
    use chrono::NaiveDateTime;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn wizard_at(now: &str, user: Option<SessionUser>) -> BookingWizard {
        BookingWizard::new(
            Arc::new(StaticAvailability::new(BusinessHours::default())),
            Arc::new(FixedClock(dt(now))),
            user,
        )
    }

    fn guest() -> BookingWizard {
        wizard_at("2025-03-09 12:00", None)
    }

    fn signed_in() -> BookingWizard {
        wizard_at("2025-03-09 12:00", Some(registered_user()))
    }

    async fn at_date_time(wizard: &mut BookingWizard) {
        wizard.select_service(haircut()).unwrap();
        wizard.next().unwrap();
        wizard.select_date(d("2025-03-10")).await.unwrap();
        wizard.select_time(t("10:00")).unwrap();
    }

    fn fill_guest_details(wizard: &mut BookingWizard) {
        wizard
            .update_details(&DetailsPatch {
                first_name: Some("Anna".to_string()),
                last_name: Some("Test".to_string()),
                email: Some("a@test.de".to_string()),
                ..Default::default()
            })
            .unwrap();
    }

    #[test]
    fn test_starts_empty_on_first_step() {
        let wizard = guest();
        assert_eq!(wizard.draft(), &BookingDraft::empty());
        assert_eq!(wizard.visible_steps().len(), 4);
        assert_eq!(wizard.step_number(StepId::Confirm), Some(4));
    }

    #[test]
    fn test_deep_link_opens_on_date_step() {
        let wizard = guest().with_service(haircut());
        assert_eq!(wizard.current_step(), StepId::SelectDateTime);
        assert_eq!(wizard.draft().selected_service, Some(haircut()));
    }

    #[test]
    fn test_next_requires_service() {
        let mut wizard = guest();
        assert!(matches!(wizard.next(), Err(WizardError::MissingService)));
        assert_eq!(wizard.current_step(), StepId::SelectService);
    }

    #[tokio::test]
    async fn test_date_in_past_rejected() {
        let mut wizard = guest();
        wizard.select_service(haircut()).unwrap();
        wizard.next().unwrap();
        let err = wizard.select_date(d("2025-03-08")).await.unwrap_err();
        assert!(matches!(err, WizardError::DateInPast(_)));
        assert_eq!(wizard.draft().selected_date, None);
    }

    #[tokio::test]
    async fn test_time_must_be_in_slot_set() {
        let mut wizard = guest();
        wizard.select_service(haircut()).unwrap();
        wizard.next().unwrap();
        wizard.select_date(d("2025-03-10")).await.unwrap();
        assert!(matches!(
            wizard.select_time(t("18:00")),
            Err(WizardError::SlotUnavailable(_))
        ));
        assert!(matches!(
            wizard.select_time(t("10:15")),
            Err(WizardError::SlotUnavailable(_))
        ));
        wizard.select_time(t("17:30")).unwrap();
    }

    #[tokio::test]
    async fn test_closed_day_shows_no_slots() {
        let mut wizard = wizard_at("2025-03-08 12:00", None);
        wizard.select_service(haircut()).unwrap();
        wizard.next().unwrap();
        let slots = wizard.select_date(d("2025-03-09")).await.unwrap();
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn test_changing_date_or_service_clears_time() {
        let mut wizard = guest();
        at_date_time(&mut wizard).await;
        assert_eq!(wizard.draft().selected_time, Some(t("10:00")));

        wizard.select_date(d("2025-03-11")).await.unwrap();
        assert_eq!(wizard.draft().selected_time, None);

        wizard.select_time(t("11:00")).unwrap();
        let mut colour = haircut();
        colour.id = 2;
        colour.duration_minutes = 90;
        wizard.select_service(colour).unwrap();
        assert_eq!(wizard.draft().selected_time, None);
        assert_eq!(wizard.draft().selected_date, None);
        assert!(wizard.slots().is_empty());
    }

    #[tokio::test]
    async fn test_guest_goes_through_details() {
        let mut wizard = guest();
        at_date_time(&mut wizard).await;
        assert_eq!(wizard.next().unwrap(), StepId::EnterDetails);

        let err = wizard.next().unwrap_err();
        assert!(matches!(err, WizardError::Validation(_)));
        assert_eq!(wizard.current_step(), StepId::EnterDetails);

        fill_guest_details(&mut wizard);
        assert_eq!(wizard.next().unwrap(), StepId::Confirm);
        assert_eq!(wizard.draft().customer_details.first_name, "Anna");
    }

    #[tokio::test]
    async fn test_guest_account_password_too_short() {
        let mut wizard = guest();
        at_date_time(&mut wizard).await;
        wizard.next().unwrap();
        fill_guest_details(&mut wizard);
        wizard
            .update_details(&DetailsPatch {
                password: Some("abc".to_string()),
                create_account: Some(true),
                ..Default::default()
            })
            .unwrap();

        match wizard.next() {
            Err(WizardError::Validation(errors)) => {
                assert!(errors.for_field("password").is_some())
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(wizard.current_step(), StepId::EnterDetails);
    }

    #[tokio::test]
    async fn test_signed_in_skips_details() {
        let mut wizard = signed_in();
        assert_eq!(
            wizard.visible_steps(),
            vec![StepId::SelectService, StepId::SelectDateTime, StepId::Confirm]
        );
        assert_eq!(wizard.step_number(StepId::Confirm), Some(3));
        assert_eq!(wizard.step_number(StepId::EnterDetails), None);

        at_date_time(&mut wizard).await;
        assert_eq!(wizard.next().unwrap(), StepId::Confirm);
        assert_eq!(wizard.back().unwrap(), StepId::SelectDateTime);
        assert_eq!(wizard.next().unwrap(), StepId::Confirm);
        assert_eq!(wizard.draft().customer_details.email, "a@test.de");
        assert_eq!(wizard.draft().customer_details.password, None);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let mut wizard = guest();
        at_date_time(&mut wizard).await;

        wizard.reset();
        let once = wizard.draft().clone();
        wizard.reset();
        assert_eq!(wizard.draft(), &once);
        assert_eq!(wizard.draft(), &BookingDraft::empty());
        assert!(wizard.slots().is_empty());
    }

    #[tokio::test]
    async fn test_back_from_confirm_clears_error() {
        let api = Arc::new(MockApi {
            create: Err(ApiError::Conflict("Time slot not available".to_string())),
            ..MockApi::new()
        });
        let service = BookingSubmissionService::new(api);

        let mut wizard = guest();
        at_date_time(&mut wizard).await;
        wizard.next().unwrap();
        fill_guest_details(&mut wizard);
        wizard.next().unwrap();

        let report = wizard.confirm(&service).await.unwrap();
        assert_eq!(report.outcome.status, OutcomeStatus::Error);
        assert_eq!(wizard.current_step(), StepId::Confirm);
        assert!(wizard.draft().submission_outcome.is_some());

        assert_eq!(wizard.back().unwrap(), StepId::EnterDetails);
        assert_eq!(wizard.draft().submission_outcome, None);
    }

    #[tokio::test]
    async fn test_registration_failure_returns_to_details() {
        let api = Arc::new(MockApi {
            signup: Err(ApiError::Conflict("Error: Email is already in use!".to_string())),
            ..MockApi::new()
        });
        let service = BookingSubmissionService::new(api.clone());

        let mut wizard = guest();
        at_date_time(&mut wizard).await;
        wizard.next().unwrap();
        fill_guest_details(&mut wizard);
        wizard
            .update_details(&DetailsPatch {
                password: Some("secret1".to_string()),
                create_account: Some(true),
                ..Default::default()
            })
            .unwrap();
        wizard.next().unwrap();

        wizard.confirm(&service).await.unwrap();
        assert_eq!(wizard.current_step(), StepId::EnterDetails);
        assert_eq!(api.calls(), vec!["signup"]);
        assert!(wizard
            .draft()
            .submission_outcome
            .as_ref()
            .and_then(|o| o.message.as_deref())
            .unwrap()
            .contains("already exists"));
    }

    #[tokio::test]
    async fn test_double_submission_blocked() {
        let mut wizard = signed_in();
        at_date_time(&mut wizard).await;
        wizard.next().unwrap();

        let ticket = wizard.begin_submission().unwrap();
        assert!(wizard.is_submitting());
        assert_eq!(
            wizard.draft().submission_outcome,
            Some(SubmissionOutcome::pending())
        );
        assert!(matches!(
            wizard.begin_submission(),
            Err(WizardError::SubmissionInProgress)
        ));
        assert_eq!(ticket.draft.selected_time, Some(t("10:00")));
    }

    #[tokio::test]
    async fn test_result_after_reset_is_discarded() {
        let api = Arc::new(MockApi::new());
        let service = BookingSubmissionService::new(api);

        let mut wizard = signed_in();
        at_date_time(&mut wizard).await;
        wizard.next().unwrap();

        let ticket = wizard.begin_submission().unwrap();
        wizard.reset();
        let report = service.submit(&ticket.draft, ticket.session_user.as_ref()).await;
        assert!(!wizard.complete_submission(&ticket, &report));
        assert_eq!(wizard.draft(), &BookingDraft::empty());
        assert!(!wizard.is_submitting());
    }

    #[tokio::test]
    async fn test_expired_slot_rejected_before_network() {
        let mut wizard = wizard_at("2025-03-10 09:40", Some(registered_user()));
        wizard.select_service(haircut()).unwrap();
        wizard.next().unwrap();
        wizard.select_date(d("2025-03-10")).await.unwrap();
        wizard.select_time(t("10:00")).unwrap();
        wizard.next().unwrap();

        // Same draft, but the clock has moved past the slot
        wizard.clock = Arc::new(FixedClock(dt("2025-03-10 10:05")));
        assert!(matches!(
            wizard.begin_submission(),
            Err(WizardError::SlotExpired)
        ));
        assert!(!wizard.is_submitting());
    }

    #[tokio::test]
    async fn test_refresh_drops_elapsed_time() {
        let mut wizard = wizard_at("2025-03-10 09:40", None);
        wizard.select_service(haircut()).unwrap();
        wizard.next().unwrap();
        wizard.select_date(d("2025-03-10")).await.unwrap();
        wizard.select_time(t("10:00")).unwrap();

        wizard.clock = Arc::new(FixedClock(dt("2025-03-10 10:05")));
        let slots = wizard.refresh_slots().await.unwrap().to_vec();
        assert_eq!(slots.first(), Some(&t("10:30")));
        assert_eq!(wizard.draft().selected_time, None);
    }

    #[tokio::test]
    async fn test_login_mid_flow_skips_details_and_keeps_notes() {
        let mut wizard = guest();
        at_date_time(&mut wizard).await;
        wizard.next().unwrap();
        wizard
            .update_details(&DetailsPatch {
                notes: Some("Allergic to lavender".to_string()),
                ..Default::default()
            })
            .unwrap();

        wizard.on_session_changed(Some(registered_user()));
        assert_eq!(wizard.current_step(), StepId::Confirm);
        assert!(wizard.identity_locked());
        assert_eq!(
            wizard.draft().customer_details.notes.as_deref(),
            Some("Allergic to lavender")
        );

        wizard.on_session_changed(None);
        assert_eq!(wizard.current_step(), StepId::EnterDetails);
        assert_eq!(wizard.draft().customer_details.first_name, "");
        assert_eq!(
            wizard.draft().customer_details.notes.as_deref(),
            Some("Allergic to lavender")
        );
    }

    #[tokio::test]
    async fn test_guest_end_to_end_without_password() {
        let api = Arc::new(MockApi::new());
        let service = BookingSubmissionService::new(api.clone());

        let mut wizard = guest();
        at_date_time(&mut wizard).await;
        wizard.next().unwrap();
        fill_guest_details(&mut wizard);
        wizard.next().unwrap();

        let report = wizard.confirm(&service).await.unwrap();
        assert_eq!(report.outcome.status, OutcomeStatus::Success);
        assert_eq!(api.calls(), vec!["create 2025-03-10T10:00:00"]);
        assert!(wizard.draft().is_booked());
        assert!(matches!(wizard.back(), Err(WizardError::AlreadyBooked)));

        let (filename, ics) = wizard.calendar_export().unwrap();
        assert_eq!(filename, "Haircut.ics");
        assert!(ics.contains("SUMMARY:Haircut"));
    }
}
