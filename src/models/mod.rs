pub mod appointment;
pub mod availability;
pub mod draft;
pub mod service;
pub mod user;

pub use appointment::{
    AppointmentCustomer, AppointmentRequest, CreatedAppointment, ServiceRef, SigninRequest,
    SignupRequest,
};
pub use availability::{BlockedSlot, BusinessHours, WorkingHours};
pub use draft::{
    BookingDraft, CustomerDetails, DetailsPatch, IdentityMode, OutcomeStatus, StepId,
    SubmissionOutcome,
};
pub use service::Service;
pub use user::SessionUser;
