//! Gateway client implementations
//!
//! Concrete implementations of the CoinGateway trait.

#[cfg(feature = "http-client")]
pub mod coinpayments;

#[cfg(feature = "http-client")]
pub use coinpayments::CoinPaymentsClient;
