pub mod api;
pub mod availability;
pub mod calendar;
pub mod catalog;
pub mod clock;
pub mod details;
pub mod identity;
pub mod session;
pub mod submission;
pub mod wizard;
