//! HTTP handlers, grouped by resource.

pub mod auth;
pub mod form;
pub mod health;
pub mod instruments;
pub mod loans;
pub mod metrics;
pub mod profiles;
pub mod reviews;
