use tracing::debug;

use crate::errors::CloudSweepError;

/// Resolve a secret value. A leading '$' is an environment variable reference,
/// and an unset variable is an error rather than a literal key.
pub fn resolve_credential(value: &str) -> Result<String, CloudSweepError> {
    let Some(var_name) = value.strip_prefix('$') else {
        return Ok(value.to_string());
    };
    match std::env::var(var_name) {
        Ok(resolved) if !resolved.is_empty() => {
            debug!(var = %var_name, "Resolved credential from environment");
            Ok(resolved)
        }
        _ => Err(CloudSweepError::Config(format!(
            "credential references ${} but that environment variable is not set",
            var_name
        ))),
    }
}
