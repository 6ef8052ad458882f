//! CoinPayments gateway client
//!
//! Talks to the CoinPayments v1 merchant API: every command is a form-encoded `POST`
//! to a single endpoint, authenticated by an HMAC-SHA512 signature of the body.

use crate::config::GatewaySettings;
use crate::error::{GatewayError, IntegrationError};
use crate::payments::traits::{CoinGateway, GatewayResult};
use crate::payments::types::{
    AccountInfo, CreateTransactionRequest, CreateTransactionResponse, CreatedTransaction,
    Environment, GatewayCredentials, TransactionInfo,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, error};

const API_VERSION: &str = "1";
const STATUS_OK: &str = "ok";

/// CoinPayments gateway client
///
/// The HTTP client and both endpoints are set up once; credentials and the
/// environment are supplied per call.
pub struct CoinPaymentsClient {
    settings: GatewaySettings,
    client: Client,
    production_endpoint: Url,
    sandbox_endpoint: Url,
}

impl CoinPaymentsClient {
    pub fn new(settings: GatewaySettings) -> Result<Self, IntegrationError> {
        settings
            .validate()
            .map_err(|e| IntegrationError::configuration(e.to_string()))?;

        let production_endpoint = parse_endpoint(&settings.production_url)?;
        let sandbox_endpoint = parse_endpoint(&settings.sandbox_url)?;

        let client = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| {
                IntegrationError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            settings,
            client,
            production_endpoint,
            sandbox_endpoint,
        })
    }

    fn endpoint(&self, environment: Environment) -> &Url {
        match environment {
            Environment::Production => &self.production_endpoint,
            Environment::Sandbox => &self.sandbox_endpoint,
        }
    }

    /// Send one command and return its response envelope
    async fn call(
        &self,
        credentials: &GatewayCredentials,
        environment: Environment,
        cmd: &str,
        params: &[(&str, String)],
    ) -> GatewayResult<Envelope> {
        let endpoint = self.endpoint(environment);
        let body = encode_body(endpoint, cmd, &credentials.public_key, params);
        let signature = sign(credentials.private_key.reveal(), &body);

        debug!(cmd, %environment, %endpoint, "Sending CoinPayments request");

        let request = self
            .client
            .post(endpoint.clone())
            .header("HMAC", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body);

        let seconds = self.settings.timeout_secs;
        let exchange = async {
            let response = request.send().await?.error_for_status()?;
            response.text().await
        };
        let text = timeout(self.settings.request_timeout(), exchange)
            .await
            .map_err(|_| GatewayError::timeout(seconds))?
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::timeout(seconds)
                } else {
                    GatewayError::from(e)
                }
            })?;

        let envelope: Envelope = serde_json::from_str(&text)?;
        debug!(cmd, status = %envelope.error, "CoinPayments response received");
        Ok(envelope)
    }
}

fn parse_endpoint(url: &str) -> Result<Url, IntegrationError> {
    Url::parse(url)
        .map_err(|e| IntegrationError::configuration(format!("Invalid endpoint {}: {}", url, e)))
}

/// Form-encode a command body. The endpoint is only used as a carrier for the
/// serializer, its own query string is dropped.
fn encode_body(endpoint: &Url, cmd: &str, public_key: &str, params: &[(&str, String)]) -> String {
    let mut url = endpoint.clone();
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("version", API_VERSION)
            .append_pair("cmd", cmd)
            .append_pair("key", public_key)
            .append_pair("format", "json");
        for (name, value) in params {
            pairs.append_pair(name, value);
        }
    }
    url.query().unwrap_or_default().to_string()
}

/// Lowercase hex HMAC-SHA512 of the request body
fn sign(private_key: &str, body: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha512;

    type HmacSha512 = Hmac<Sha512>;

    let mut mac = HmacSha512::new_from_slice(private_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Unwrap a read-only command result, treating any non-ok status as a rejection
fn accepted<T: DeserializeOwned>(cmd: &str, envelope: Envelope) -> GatewayResult<T> {
    if !envelope.error.eq_ignore_ascii_case(STATUS_OK) {
        error!(cmd, status = %envelope.error, "CoinPayments rejected request");
        return Err(GatewayError::rejected(envelope.error));
    }
    Ok(serde_json::from_value(envelope.result)?)
}

#[async_trait]
impl CoinGateway for CoinPaymentsClient {
    async fn get_account_info(
        &self,
        credentials: &GatewayCredentials,
        environment: Environment,
    ) -> GatewayResult<AccountInfo> {
        let envelope = self
            .call(credentials, environment, "get_basic_info", &[])
            .await?;
        accepted("get_basic_info", envelope)
    }

    async fn create_transaction(
        &self,
        credentials: &GatewayCredentials,
        environment: Environment,
        request: &CreateTransactionRequest,
    ) -> GatewayResult<CreateTransactionResponse> {
        let mut params = vec![
            ("amount", request.amount.to_string()),
            ("currency1", request.currency_price.clone()),
            ("currency2", request.currency_transfer.clone()),
        ];
        if let Some(callback_url) = &request.callback_url {
            params.push(("ipn_url", callback_url.clone()));
        }
        if let Some(custom) = &request.custom {
            params.push(("custom", custom.clone()));
        }
        if let Some(buyer_email) = &request.buyer_email {
            params.push(("buyer_email", buyer_email.clone()));
        }

        let envelope = self
            .call(credentials, environment, "create_transaction", &params)
            .await?;

        // A decline is the orchestrator's call, only decode the result when accepted
        let result = if envelope.error.eq_ignore_ascii_case(STATUS_OK) {
            let created: CoinPaymentsCreatedTransaction = serde_json::from_value(envelope.result)?;
            Some(CreatedTransaction {
                transaction_id: created.txn_id,
                address: created.address,
                checkout_url: created.checkout_url,
                status_url: created.status_url,
            })
        } else {
            None
        };

        Ok(CreateTransactionResponse {
            status: envelope.error,
            result,
        })
    }

    async fn get_transaction_info(
        &self,
        credentials: &GatewayCredentials,
        environment: Environment,
        transaction_id: &str,
    ) -> GatewayResult<TransactionInfo> {
        let envelope = self
            .call(
                credentials,
                environment,
                "get_tx_info",
                &[("txid", transaction_id.to_string())],
            )
            .await?;
        let info: CoinPaymentsTransactionInfo = accepted("get_tx_info", envelope)?;

        Ok(TransactionInfo {
            coin: info.coin,
            payment_address: info.payment_address,
            status_text: info.status_text,
            kind: info.kind,
            confirmations: info.recv_confirms.as_i64()?,
            amount_received: info.receivedf.as_f64()?,
        })
    }
}

// CoinPayments response envelope
#[derive(Debug, Deserialize)]
struct Envelope {
    error: String,
    #[serde(default)]
    result: Value,
}

// create_transaction result
#[derive(Debug, Deserialize)]
struct CoinPaymentsCreatedTransaction {
    txn_id: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    checkout_url: Option<String>,
    #[serde(default)]
    status_url: Option<String>,
}

// get_tx_info result
#[derive(Debug, Deserialize)]
struct CoinPaymentsTransactionInfo {
    #[serde(default)]
    coin: String,
    #[serde(default)]
    payment_address: String,
    #[serde(default)]
    status_text: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    recv_confirms: Numeric,
    #[serde(default)]
    receivedf: Numeric,
}

// The API sends numbers either as JSON numbers or as strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(serde_json::Number),
    Text(String),
}

impl Default for Numeric {
    fn default() -> Self {
        Numeric::Text("0".to_string())
    }
}

impl Numeric {
    fn as_i64(&self) -> GatewayResult<i64> {
        match self {
            Numeric::Number(n) => n
                .as_i64()
                .ok_or_else(|| GatewayError::invalid_response(format!("Not an integer: {}", n))),
            Numeric::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| GatewayError::invalid_response(format!("Not an integer: {}", s))),
        }
    }

    fn as_f64(&self) -> GatewayResult<f64> {
        match self {
            Numeric::Number(n) => n
                .as_f64()
                .ok_or_else(|| GatewayError::invalid_response(format!("Not a number: {}", n))),
            Numeric::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| GatewayError::invalid_response(format!("Not a number: {}", s))),
        }
    }
}
