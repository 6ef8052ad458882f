//! Merchant configuration checks

use crate::error::{IntegrationError, IntegrationResult};
use crate::payments::types::{
    GatewayCredentials, IntegrationConfiguration, Secret, PRIVATE_KEY, PUBLIC_KEY,
};

/// Integration keys that must be present and non-blank
pub const REQUIRED_KEYS: [&str; 2] = [PUBLIC_KEY, PRIVATE_KEY];

/// Validate the merchant configuration.
///
/// Missing and blank keys are reported the same way, and every failing key is listed
/// in [`REQUIRED_KEYS`] order.
pub fn validate_configuration(configuration: &IntegrationConfiguration) -> IntegrationResult<()> {
    let error_fields: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| is_blank(configuration.key(key)))
        .map(|key| key.to_string())
        .collect();

    if error_fields.is_empty() {
        Ok(())
    } else {
        Err(IntegrationError::validation(error_fields))
    }
}

/// Pull the gateway credentials out of the configuration.
///
/// Only absence is checked here; blank values are the validator's business.
pub(crate) fn credentials(
    configuration: &IntegrationConfiguration,
) -> IntegrationResult<GatewayCredentials> {
    let public_key = configuration
        .key(PUBLIC_KEY)
        .ok_or_else(|| IntegrationError::missing_key(PUBLIC_KEY))?;
    let private_key = configuration
        .key(PRIVATE_KEY)
        .ok_or_else(|| IntegrationError::missing_key(PRIVATE_KEY))?;

    Ok(GatewayCredentials {
        public_key: public_key.to_string(),
        private_key: Secret::new(private_key.to_string()),
    })
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
