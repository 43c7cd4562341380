//! HTTP handlers for login-service.

pub mod account;
pub mod metrics;

pub use account::*;
