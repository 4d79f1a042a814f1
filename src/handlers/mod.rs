pub mod calendar;
pub mod health;
pub mod services;
pub mod session;
pub mod wizard;
