//! API handlers.

pub mod admin;
pub mod credits;
pub mod device_trial;
pub mod health;
pub mod profiles;
