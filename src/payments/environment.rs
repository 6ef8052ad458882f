use tracing::warn;

use crate::payments::types::{Environment, IntegrationConfiguration, TEST_ENVIRONMENT};

/// Map the configuration's environment flag onto the gateway mode.
///
/// Sandbox only for the exact test marker. Everything else, including a missing flag
/// or a lowercase `"test"`, resolves to production; flags other than `PRODUCTION`
/// are logged so a typo does not go unnoticed. Use `Environment::from_str` to reject
/// them instead.
pub fn resolve_environment(configuration: &IntegrationConfiguration) -> Environment {
    match configuration.environment.as_deref() {
        Some(TEST_ENVIRONMENT) => Environment::Sandbox,
        None | Some("PRODUCTION") => Environment::Production,
        Some(other) => {
            warn!(
                environment_flag = other,
                "Unrecognized environment flag, resolving to production"
            );
            Environment::Production
        }
    }
}
