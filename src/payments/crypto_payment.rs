//! Crypto payment module
//!
//! Drives a payment through init, authorize and capture against a [`CoinGateway`].
//! The module keeps no state between calls; the transaction returned by one step is
//! the token for the next.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, error, field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::error::{GatewayError, IntegrationError, IntegrationResult};
use crate::payments::environment::resolve_environment;
use crate::payments::traits::{CoinGateway, PaymentModule};
use crate::payments::types::{
    detail_keys, CreateTransactionRequest, Customer, IntegrationConfiguration, MerchantStore,
    Order, Payment, PaymentType, ShoppingCartItem, Transaction, TransactionDetails,
    TransactionOutcome, TransactionType,
};
use crate::payments::validation::{credentials, validate_configuration};

/// Cryptocurrency buyers transfer unless configured otherwise
pub const DEFAULT_TRANSFER_CURRENCY: &str = "BTC";

/// Status the gateway reports for an accepted request (compared case-insensitively)
const GATEWAY_OK: &str = "ok";

/// Convert an order amount into the gateway's floating point format.
///
/// This is where decimal precision is lost: amounts that have no exact `f64`
/// representation are rounded to the nearest one before being sent.
pub fn amount_to_gateway(amount: Decimal) -> IntegrationResult<f64> {
    amount.to_f64().ok_or_else(|| {
        IntegrationError::precondition(format!("Amount {} cannot be sent to the gateway", amount))
    })
}

/// Payment module backed by a cryptocurrency processor
pub struct CryptoPayment<G> {
    gateway: G,
    transfer_currency: String,
    span: Span,
}

impl<G: CoinGateway> CryptoPayment<G> {
    /// Create a module that logs under the span current at construction time
    pub fn new(gateway: G, transfer_currency: impl Into<String>) -> Self {
        Self::with_span(gateway, transfer_currency, Span::current())
    }

    /// Create a module whose per-call spans are children of `span`
    pub fn with_span(gateway: G, transfer_currency: impl Into<String>, span: Span) -> Self {
        Self {
            gateway,
            transfer_currency: transfer_currency.into(),
            span,
        }
    }

    fn call_span(&self, operation: &'static str) -> Span {
        info_span!(
            parent: &self.span,
            "crypto_payment",
            operation,
            call_id = %Uuid::new_v4(),
            environment = field::Empty
        )
    }
}

/// Gateway reference carried by a prior transaction, or a precondition error if the
/// transaction cannot be captured.
fn capture_reference(transaction: &Transaction) -> IntegrationResult<&str> {
    match transaction.details.as_ref().and_then(|d| d.gateway_reference()) {
        Some(reference) => Ok(reference),
        None => {
            let details = transaction
                .details_text()
                .unwrap_or_else(|| "none".to_string());
            error!(details = %details, "Cannot capture transaction without a valid reference");
            Err(IntegrationError::precondition(format!(
                "invalid prior transaction reference: {}",
                details
            )))
        }
    }
}

fn log_gateway_failure(e: GatewayError) -> IntegrationError {
    error!(error = %e, cause = ?std::error::Error::source(&e), "CoinPayments API call failed");
    IntegrationError::Gateway(e)
}

#[async_trait]
impl<G: CoinGateway> PaymentModule for CryptoPayment<G> {
    fn validate_module_configuration(
        &self,
        configuration: &IntegrationConfiguration,
        store: &MerchantStore,
    ) -> IntegrationResult<()> {
        validate_configuration(configuration).inspect_err(|e| {
            warn!(store = %store.code, fields = ?e.error_fields(), "Invalid payment module configuration");
        })
    }

    async fn init_transaction(
        &self,
        _store: &MerchantStore,
        _customer: &Customer,
        amount: Decimal,
        payment: &Payment,
        configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<Transaction> {
        let span = self.call_span("init_transaction");
        async move {
            let credentials = credentials(configuration)?;
            let environment = resolve_environment(configuration);
            Span::current().record("environment", environment.name());

            let mut transaction =
                Transaction::new(amount, payment.payment_type, payment.transaction_type);

            let account = self
                .gateway
                .get_account_info(&credentials, environment)
                .await
                .map_err(log_gateway_failure)?;

            info!(merchant_id = %account.merchant_id, "CoinPayments API initialized");
            transaction.details = Some(TransactionDetails::Diagnostic(format!(
                "{}: {}",
                environment.name(),
                account
            )));
            Ok(transaction)
        }
        .instrument(span)
        .await
    }

    async fn authorize(
        &self,
        store: &MerchantStore,
        customer: &Customer,
        _items: &[ShoppingCartItem],
        amount: Decimal,
        payment: &Payment,
        configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<Transaction> {
        let span = self.call_span("authorize");
        async move {
            let credentials = credentials(configuration)?;
            let environment = resolve_environment(configuration);
            Span::current().record("environment", environment.name());

            if amount <= Decimal::ZERO {
                return Err(IntegrationError::precondition(format!(
                    "authorization amount must be positive, got {}",
                    amount
                )));
            }

            let mut transaction =
                Transaction::new(amount, payment.payment_type, payment.transaction_type);

            let request = CreateTransactionRequest {
                amount: amount_to_gateway(amount)?,
                currency_price: payment.currency.clone(),
                currency_transfer: self.transfer_currency.clone(),
                callback_url: store.continue_shopping_url.clone(),
                custom: Some(customer.email_address.clone()),
                buyer_email: Some(customer.email_address.clone()),
            };
            debug!(
                amount = request.amount,
                currency_price = %request.currency_price,
                currency_transfer = %request.currency_transfer,
                "Creating CoinPayments transaction"
            );

            let response = self
                .gateway
                .create_transaction(&credentials, environment, &request)
                .await
                .map_err(log_gateway_failure)?;

            if response.status.eq_ignore_ascii_case(GATEWAY_OK) {
                let created = response.result.ok_or_else(|| {
                    log_gateway_failure(GatewayError::invalid_response(
                        "accepted transaction without a result",
                    ))
                })?;
                info!(transaction_id = %created.transaction_id, "CoinPayments transaction created");
                transaction.details = Some(TransactionDetails::GatewayReference(
                    created.transaction_id,
                ));
            } else {
                warn!(status = %response.status, "CoinPayments declined transaction");
                transaction.details = Some(TransactionDetails::Declined(response.status));
            }
            Ok(transaction)
        }
        .instrument(span)
        .await
    }

    async fn capture(
        &self,
        _store: &MerchantStore,
        _customer: &Customer,
        order: &Order,
        capturable_transaction: &Transaction,
        configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<Transaction> {
        let span = self.call_span("capture");
        async move {
            let credentials = credentials(configuration)?;
            let reference = capture_reference(capturable_transaction)?;
            let environment = resolve_environment(configuration);
            Span::current().record("environment", environment.name());

            let info = self
                .gateway
                .get_transaction_info(&credentials, environment, reference)
                .await
                .map_err(log_gateway_failure)?;

            let mut transaction = Transaction::new(
                order.total,
                PaymentType::Cryptocurrency,
                TransactionType::Capture,
            );
            transaction.order_id = Some(order.id);
            transaction.details = Some(TransactionDetails::GatewayReference(reference.to_string()));

            let details = &mut transaction.transaction_details;
            details.insert(detail_keys::COIN.to_string(), info.coin);
            details.insert(detail_keys::PAYMENT_ADDRESS.to_string(), info.payment_address);
            details.insert(detail_keys::STATUS_TEXT.to_string(), info.status_text);
            details.insert(detail_keys::TYPE.to_string(), info.kind);
            details.insert(
                detail_keys::CONFIRMATIONS.to_string(),
                info.confirmations.to_string(),
            );
            details.insert(
                detail_keys::AMOUNT_RECEIVED.to_string(),
                info.amount_received.to_string(),
            );

            info!(order_id = order.id, transaction_id = %reference, "CoinPayments transaction captured");
            Ok(transaction)
        }
        .instrument(span)
        .await
    }

    async fn authorize_and_capture(
        &self,
        _store: &MerchantStore,
        _customer: &Customer,
        _items: &[ShoppingCartItem],
        _amount: Decimal,
        _payment: &Payment,
        _configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<TransactionOutcome> {
        debug!(parent: &self.span, "authorize_and_capture is not supported by CoinPayments");
        Ok(TransactionOutcome::Unsupported {
            operation: "authorize_and_capture",
        })
    }

    async fn refund(
        &self,
        _partial: bool,
        _store: &MerchantStore,
        _transaction: &Transaction,
        _order: &Order,
        _amount: Decimal,
        _configuration: &IntegrationConfiguration,
    ) -> IntegrationResult<TransactionOutcome> {
        debug!(parent: &self.span, "refund is not supported by CoinPayments");
        Ok(TransactionOutcome::Unsupported {
            operation: "refund",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_to_gateway() {
        assert!((amount_to_gateway(dec!(19.99)).unwrap() - 19.99).abs() < 1e-9);
        assert_eq!(amount_to_gateway(dec!(250)).unwrap(), 250.0);
        // 28 significant digits do not survive the trip
        let precise = dec!(0.1234567890123456789012345678);
        let converted = amount_to_gateway(precise).unwrap();
        assert_ne!(Decimal::try_from(converted).unwrap(), precise);
    }

    #[test]
    fn test_capture_reference_rejects_declines_and_gaps() {
        let mut tx = Transaction::new(dec!(1), PaymentType::Cryptocurrency, TransactionType::Authorize);
        assert!(matches!(
            capture_reference(&tx),
            Err(IntegrationError::Precondition { .. })
        ));

        tx.details = Some(TransactionDetails::Declined("FAIL".to_string()));
        assert!(capture_reference(&tx).is_err());

        tx.details = Some(TransactionDetails::Diagnostic("production: AccountInfo()".to_string()));
        assert!(capture_reference(&tx).is_err());

        tx.details = Some(TransactionDetails::GatewayReference("TXID123".to_string()));
        assert_eq!(capture_reference(&tx).unwrap(), "TXID123");
    }
}
