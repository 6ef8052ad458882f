pub mod config;
pub mod error;
pub mod payments;

pub use error::{GatewayError, IntegrationError, IntegrationResult};
