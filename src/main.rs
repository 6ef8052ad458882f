use cryptopay_gateway::config::{integration_from_env, GatewaySettings};
use cryptopay_gateway::payments::providers::CoinPaymentsClient;
use cryptopay_gateway::payments::types::{
    Customer, MerchantStore, Payment, PaymentType, TransactionType,
};
use cryptopay_gateway::payments::{resolve_environment, CryptoPayment, PaymentModule};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("CRYPTOPAY_LOG_JSON")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = GatewaySettings::from_env()?;
    let configuration = integration_from_env();
    let environment = resolve_environment(&configuration);

    tracing::info!("Starting CoinPayments credential probe");
    tracing::info!("Environment: {}", environment);
    tracing::info!("Endpoint: {}", settings.endpoint(environment));

    let store = MerchantStore {
        code: std::env::var("CRYPTOPAY_STORE_CODE").unwrap_or_else(|_| "DEFAULT".to_string()),
        continue_shopping_url: std::env::var("CRYPTOPAY_CALLBACK_URL").ok(),
    };
    let customer = Customer::default();
    let payment = Payment {
        payment_type: PaymentType::Cryptocurrency,
        transaction_type: TransactionType::Init,
        currency: "USD".to_string(),
    };

    let transfer_currency = settings.transfer_currency.clone();
    let module = CryptoPayment::new(CoinPaymentsClient::new(settings)?, transfer_currency);

    if let Err(e) = module.validate_module_configuration(&configuration, &store) {
        tracing::error!("{}", e.customer_message());
        return Err(e.into());
    }

    let transaction = module
        .init_transaction(&store, &customer, Decimal::ZERO, &payment, &configuration)
        .await?;

    println!("{}", serde_json::to_string_pretty(&transaction)?);
    Ok(())
}
