use crate::types::HealthRes;

/// Health service for the upload API.
///
/// The check is static: the service is healthy as long as the process can answer.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Returns a `HealthRes` with status `ok`.
    pub fn check_health() -> HealthRes {
        HealthRes {
            status: "ok".into(),
        }
    }
}
