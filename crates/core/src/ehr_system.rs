use crate::constants::UNKNOWN_EHR_SYSTEM;

/// Resolve the source-system label supplied with an upload.
///
/// The value is used verbatim (no trimming). `None` or an empty string resolves to `Unknown`.
pub fn resolve_ehr_system(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN_EHR_SYSTEM.to_string())
}
