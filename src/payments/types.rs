//! Crypto payment types and data structures
//!
//! Merchant-side inputs, the transaction record handed back to the caller, and the
//! request/response shapes exchanged with the gateway adapter.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::IntegrationError;

/// Integration key holding the gateway public key
pub const PUBLIC_KEY: &str = "public_key";
/// Integration key holding the gateway private key
pub const PRIVATE_KEY: &str = "private_key";
/// Environment flag value selecting the sandbox
pub const TEST_ENVIRONMENT: &str = "TEST";
/// Marker whose presence in legacy details text flags a failed authorization
pub const ERROR_MARKER: &str = "Error";
/// Leading text of a rendered decline
const DECLINE_PREFIX: &str = "Error: ";

/// Keys of the capture-time transaction detail map
pub mod detail_keys {
    pub const COIN: &str = "COIN";
    pub const PAYMENT_ADDRESS: &str = "PAYMENT_ADDRESS";
    pub const STATUS_TEXT: &str = "STATUS_TEXT";
    pub const TYPE: &str = "TYPE";
    pub const CONFIRMATIONS: &str = "CONFIRMATIONS";
    pub const AMOUNT_RECEIVED: &str = "AMOUNT_RECEIVED";
}

/// Wraps a sensitive value so it never ends up in logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T>
where
    T: Clone + Default,
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Merchant-supplied gateway settings, read-only to this crate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationConfiguration {
    /// Credential name to credential value
    pub integration_keys: HashMap<String, String>,
    /// `"TEST"` selects the sandbox, anything else (or nothing) production
    pub environment: Option<String>,
}

impl IntegrationConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.integration_keys.insert(name.into(), value.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn key(&self, name: &str) -> Option<&str> {
        self.integration_keys.get(name).map(String::as_str)
    }
}

/// Gateway operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    pub fn name(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Sandbox => "sandbox",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strict parse of an environment flag. Only the test marker and `PRODUCTION` are
/// accepted, and both map the same way `resolve_environment` maps them.
impl FromStr for Environment {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TEST_ENVIRONMENT => Ok(Environment::Sandbox),
            "PRODUCTION" => Ok(Environment::Production),
            other => Err(IntegrationError::configuration(format!(
                "Unrecognized environment flag '{}', expected TEST or PRODUCTION",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    CreditCard,
    Free,
    MoneyOrder,
    Paypal,
    Invoice,
    DirectBank,
    Cryptocurrency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Init,
    Authorize,
    Capture,
    AuthorizeCapture,
    Refund,
    Ok,
}

/// Payment metadata chosen at checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_type: PaymentType,
    pub transaction_type: TransactionType,
    /// ISO currency code the amount is priced in
    pub currency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchantStore {
    pub code: String,
    /// Used as the gateway callback URL
    pub continue_shopping_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    pub id: Option<i64>,
    pub email_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingCartItem {
    pub sku: String,
    pub quantity: u32,
    pub item_price: Decimal,
}

/// What the `details` slot of a transaction actually holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TransactionDetails {
    /// Free-form diagnostic text, not usable as a gateway reference
    Diagnostic(String),
    /// Gateway-assigned transaction id
    GatewayReference(String),
    /// Status reported by the gateway when it declined the request
    Declined(String),
    /// Persisted text carrying the error marker outside the decline prefix, kept verbatim
    Failed(String),
}

impl TransactionDetails {
    /// Rebuilds tagged details from their persisted string form.
    ///
    /// Any text containing [`ERROR_MARKER`] is read as a failure, everything else as a
    /// gateway reference. Rendering the result gives back the input text.
    pub fn from_legacy(details: Option<&str>) -> Option<Self> {
        let details = details?;
        if let Some(status) = details.strip_prefix(DECLINE_PREFIX) {
            Some(TransactionDetails::Declined(status.to_string()))
        } else if details.contains(ERROR_MARKER) {
            Some(TransactionDetails::Failed(details.to_string()))
        } else {
            Some(TransactionDetails::GatewayReference(details.to_string()))
        }
    }

    pub fn is_error(&self) -> bool {
        match self {
            TransactionDetails::Declined(_) | TransactionDetails::Failed(_) => true,
            TransactionDetails::GatewayReference(id) => id.contains(ERROR_MARKER),
            TransactionDetails::Diagnostic(_) => false,
        }
    }

    /// Gateway reference usable for capture, if any.
    pub fn gateway_reference(&self) -> Option<&str> {
        match self {
            TransactionDetails::GatewayReference(id) if !id.contains(ERROR_MARKER) => Some(id.as_str()),
            _ => None,
        }
    }
}

/// Renders the legacy string form, `"Error: <status>"` for declines.
impl fmt::Display for TransactionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionDetails::Diagnostic(text) | TransactionDetails::Failed(text) => {
                f.write_str(text)
            }
            TransactionDetails::GatewayReference(id) => f.write_str(id),
            TransactionDetails::Declined(status) => write!(f, "{}{}", DECLINE_PREFIX, status),
        }
    }
}

/// Record produced by every successful orchestrator operation. The caller owns and
/// persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub details: Option<TransactionDetails>,
    pub order_id: Option<i64>,
    /// Gateway status fields, populated by capture only
    pub transaction_details: BTreeMap<String, String>,
}

impl Transaction {
    pub fn new(amount: Decimal, payment_type: PaymentType, transaction_type: TransactionType) -> Self {
        Self {
            amount,
            payment_type,
            transaction_type,
            transaction_date: Utc::now(),
            details: None,
            order_id: None,
            transaction_details: BTreeMap::new(),
        }
    }

    /// Legacy string form of `details`.
    pub fn details_text(&self) -> Option<String> {
        self.details.as_ref().map(ToString::to_string)
    }
}

/// Result of operations a payment module may not support.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    /// Returned by modules that do support the operation
    Completed(Transaction),
    /// The gateway integration does not offer this operation
    Unsupported { operation: &'static str },
}

impl TransactionOutcome {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TransactionOutcome::Unsupported { .. })
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            TransactionOutcome::Completed(tx) => Some(tx),
            TransactionOutcome::Unsupported { .. } => None,
        }
    }
}

/// Credentials presented to the gateway on each call
#[derive(Debug, Clone, Default)]
pub struct GatewayCredentials {
    pub public_key: String,
    pub private_key: Secret<String>,
}

/// Merchant account summary returned by the account-info call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub public_name: String,
}

impl fmt::Display for AccountInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AccountInfo(username={}, merchant_id={}, email={}, public_name={})",
            self.username, self.merchant_id, self.email, self.public_name
        )
    }
}

/// Gateway transaction creation request
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTransactionRequest {
    /// Amount in the price currency. Floating point, see `amount_to_gateway`.
    pub amount: f64,
    /// Currency the order is priced in
    pub currency_price: String,
    /// Cryptocurrency the buyer transfers
    pub currency_transfer: String,
    pub callback_url: Option<String>,
    /// Correlation field echoed back by the gateway
    pub custom: Option<String>,
    pub buyer_email: Option<String>,
}

/// Transaction created on the gateway side
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedTransaction {
    pub transaction_id: String,
    pub address: Option<String>,
    pub checkout_url: Option<String>,
    pub status_url: Option<String>,
}

/// Gateway reply to a creation request. `status` is the gateway's own verdict,
/// `"ok"` on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTransactionResponse {
    pub status: String,
    pub result: Option<CreatedTransaction>,
}

/// Gateway-side state of a transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionInfo {
    pub coin: String,
    pub payment_address: String,
    pub status_text: String,
    pub kind: String,
    pub confirmations: i64,
    pub amount_received: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declined_renders_legacy_error_string() {
        let details = TransactionDetails::Declined("FAIL".to_string());
        assert_eq!(details.to_string(), "Error: FAIL");
        assert!(details.is_error());
        assert_eq!(details.gateway_reference(), None);
    }

    #[test]
    fn test_from_legacy() {
        assert_eq!(TransactionDetails::from_legacy(None), None);
        assert_eq!(
            TransactionDetails::from_legacy(Some("Error: FAIL")),
            Some(TransactionDetails::Declined("FAIL".to_string()))
        );
        assert_eq!(
            TransactionDetails::from_legacy(Some("TXID123")),
            Some(TransactionDetails::GatewayReference("TXID123".to_string()))
        );
        // substring match, not prefix match
        assert_eq!(
            TransactionDetails::from_legacy(Some("Gateway Error 42")),
            Some(TransactionDetails::Failed("Gateway Error 42".to_string()))
        );
    }

    #[test]
    fn test_from_legacy_renders_back_to_input() {
        for text in ["Error: FAIL", "Gateway Error 42", "Error:FAIL", "TXID123"] {
            let details = TransactionDetails::from_legacy(Some(text)).unwrap();
            assert_eq!(details.to_string(), text);
            assert_eq!(details.is_error(), text.contains(ERROR_MARKER), "{}", text);
            assert_eq!(details.gateway_reference().is_some(), !details.is_error(), "{}", text);
        }
    }

    #[test]
    fn test_reference_containing_marker_is_not_capturable() {
        let details = TransactionDetails::GatewayReference("CPError1".to_string());
        assert!(details.is_error());
        assert_eq!(details.gateway_reference(), None);
    }

    #[test]
    fn test_strict_environment_parse() {
        assert_eq!("TEST".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert_eq!(
            "PRODUCTION".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("test".parse::<Environment>().is_err());
        assert!("SANDBOX".parse::<Environment>().is_err());
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_outcome_completed_carries_transaction() {
        let tx = Transaction::new(Decimal::ONE, PaymentType::Cryptocurrency, TransactionType::Refund);
        let outcome = TransactionOutcome::Completed(tx.clone());
        assert!(!outcome.is_unsupported());
        assert_eq!(outcome.transaction(), Some(&tx));
    }

    #[test]
    fn test_secret_is_masked() {
        let credentials = GatewayCredentials {
            public_key: "pub".to_string(),
            private_key: Secret::new("very-private".to_string()),
        };
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("****"));
        assert!(!rendered.contains("very-private"));
        assert_eq!(credentials.private_key.reveal(), "very-private");
    }

    #[test]
    fn test_outcome_unsupported_has_no_transaction() {
        let outcome = TransactionOutcome::Unsupported { operation: "refund" };
        assert!(outcome.is_unsupported());
        assert!(outcome.transaction().is_none());
    }
}
