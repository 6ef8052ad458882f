//! Crypto payment integration module
//!
//! Mediates between the checkout workflow and a remote cryptocurrency payment
//! processor: validates merchant configuration, resolves the gateway environment and
//! drives transactions through init, authorize and capture.

pub mod crypto_payment;
pub mod environment;
pub mod providers;
pub mod traits;
pub mod types;
pub mod validation;

pub use crypto_payment::{amount_to_gateway, CryptoPayment, DEFAULT_TRANSFER_CURRENCY};
pub use environment::resolve_environment;
pub use traits::{CoinGateway, GatewayResult, PaymentModule};
pub use validation::validate_configuration;
