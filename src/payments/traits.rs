//! Payment module trait definitions
//!
//! `PaymentModule` is what the checkout workflow talks to. `CoinGateway` is the
//! boundary to the remote processor; the orchestrator only ever sees this trait so a
//! mock can stand in for the network in tests.

use crate::error::{GatewayError, IntegrationResult};
use crate::payments::types::{
    AccountInfo, CreateTransactionRequest, CreateTransactionResponse, Customer, Environment,
    GatewayCredentials, IntegrationConfiguration, MerchantStore, Order, Payment,
    ShoppingCartItem, Transaction, TransactionInfo, TransactionOutcome,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Outbound contract of the remote cryptocurrency processor
///
/// Every call performs at most one network round trip and never retries. The
/// `environment` selects the endpoint the call is sent to.
#[async_trait]
pub trait CoinGateway: Send + Sync {
    /// Fetch the merchant account summary
    async fn get_account_info(
        &self,
        credentials: &GatewayCredentials,
        environment: Environment,
    ) -> GatewayResult<AccountInfo>;

    /// Create a gateway-side transaction
    ///
    /// A gateway decline is not an error here: it comes back as a response whose
    /// `status` is not `"ok"`. Only transport and protocol failures are `Err`.
    async fn create_transaction(
        &self,
        credentials: &GatewayCredentials,
        environment: Environment,
        request: &CreateTransactionRequest,
    ) -> GatewayResult<CreateTransactionResponse>;

    /// Fetch the current state of a gateway transaction
    async fn get_transaction_info(
        &self,
        credentials: &GatewayCredentials,
        environment: Environment,
        transaction_id: &str,
    ) -> GatewayResult<TransactionInfo>;
}

/// Trait for payment module implementations
///
/// Operations are stateless: the caller carries the returned [`Transaction`] from one
/// step to the next.
#[async_trait]
pub trait PaymentModule: Send + Sync {
    /// Check that the merchant configuration carries everything the module needs
    ///
    /// Reports every failing field at once.
    fn validate_module_configuration(
        &self,
        configuration: &IntegrationConfiguration,
        store: &MerchantStore,
    ) -> IntegrationResult<()>;

    /// Check connectivity and credentials against the gateway
    async fn init_transaction(
        &self,
        store: &MerchantStore,
        customer: &Customer,
        amount: Decimal,
        payment: &Payment,
        configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<Transaction>;

    /// Request payment from the gateway
    ///
    /// A gateway decline still returns `Ok`, with the decline recorded in the
    /// transaction details.
    async fn authorize(
        &self,
        store: &MerchantStore,
        customer: &Customer,
        items: &[ShoppingCartItem],
        amount: Decimal,
        payment: &Payment,
        configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<Transaction>;

    /// Settle a previously authorized payment and fetch its status
    async fn capture(
        &self,
        store: &MerchantStore,
        customer: &Customer,
        order: &Order,
        capturable_transaction: &Transaction,
        configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<Transaction>;

    async fn authorize_and_capture(
        &self,
        store: &MerchantStore,
        customer: &Customer,
        items: &[ShoppingCartItem],
        amount: Decimal,
        payment: &Payment,
        configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<TransactionOutcome>;

    async fn refund(
        &self,
        partial: bool,
        store: &MerchantStore,
        transaction: &Transaction,
        order: &Order,
        amount: Decimal,
        configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<TransactionOutcome>;
}
