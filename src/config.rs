use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::payments::types::{Environment, IntegrationConfiguration, PRIVATE_KEY, PUBLIC_KEY};

pub const ENV_PREFIX: &str = "CRYPTOPAY";
pub const DEFAULT_API_URL: &str = "https://www.coinpayments.net/api.php";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Process-level gateway settings. Merchant credentials live in
/// [`IntegrationConfiguration`], not here.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    pub production_url: String,
    pub sandbox_url: String,
    pub timeout_secs: u64,
    pub transfer_currency: String,
    pub user_agent: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            production_url: DEFAULT_API_URL.to_string(),
            sandbox_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            transfer_currency: "BTC".to_string(),
            user_agent: concat!("cryptopay-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GatewaySettings {
    /// Defaults overlaid with `CRYPTOPAY_*` environment variables, e.g.
    /// `CRYPTOPAY_TIMEOUT_SECS=10`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = config::Config::builder()
            .set_default("production_url", defaults.production_url)?
            .set_default("sandbox_url", defaults.sandbox_url)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("transfer_currency", defaults.transfer_currency)?
            .set_default("user_agent", defaults.user_agent)?
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to load gateway settings")?
            .try_deserialize::<GatewaySettings>()
            .context("Invalid gateway settings")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("CRYPTOPAY_PRODUCTION_URL", &self.production_url),
            ("CRYPTOPAY_SANDBOX_URL", &self.sandbox_url),
        ] {
            if url.trim().is_empty() {
                return Err(anyhow!("{} cannot be empty", name));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow!("{} must be an http(s) URL, got {}", name, url));
            }
        }

        if self.timeout_secs == 0 {
            return Err(anyhow!("CRYPTOPAY_TIMEOUT_SECS must be greater than 0"));
        }

        if self.transfer_currency.trim().is_empty() {
            return Err(anyhow!("CRYPTOPAY_TRANSFER_CURRENCY cannot be empty"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoint(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.production_url,
            Environment::Sandbox => &self.sandbox_url,
        }
    }
}

/// Merchant credentials from `CRYPTOPAY_PUBLIC_KEY`, `CRYPTOPAY_PRIVATE_KEY` and
/// `CRYPTOPAY_ENVIRONMENT`. Unset variables are left out so validation reports them.
pub fn integration_from_env() -> IntegrationConfiguration {
    let mut configuration = IntegrationConfiguration::new();
    for (key, var) in [
        (PUBLIC_KEY, "CRYPTOPAY_PUBLIC_KEY"),
        (PRIVATE_KEY, "CRYPTOPAY_PRIVATE_KEY"),
    ] {
        if let Ok(value) = env::var(var) {
            configuration = configuration.with_key(key, value);
        }
    }
    configuration.environment = env::var("CRYPTOPAY_ENVIRONMENT").ok();
    configuration
}
