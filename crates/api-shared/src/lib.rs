//! # API Shared
//!
//! Shared wire types for the EHR upload service.
//!
//! Contains:
//! - JSON request/response bodies (`types` module)
//! - `HealthService`
//!
//! Used by `api-rest` and by tests that decode its responses.

pub mod health;
pub mod types;

pub use health::HealthService;
pub use types::*;
