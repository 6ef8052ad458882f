//! Tests for the CoinPayments HTTP client
//!
//! Each test starts a one-shot HTTP server on localhost that captures the request and
//! answers with a canned body, so no real gateway is contacted.

#[cfg(feature = "http-client")]
mod coinpayments_tests {
    use cryptopay_gateway::config::GatewaySettings;
    use cryptopay_gateway::error::GatewayError;
    use cryptopay_gateway::payments::providers::CoinPaymentsClient;
    use cryptopay_gateway::payments::types::{
        CreateTransactionRequest, Environment, GatewayCredentials, Secret,
    };
    use cryptopay_gateway::payments::CoinGateway;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    struct CapturedRequest {
        head: String,
        body: String,
    }

    /// Serve a single request. `response` of `None` keeps the connection open without
    /// answering until the client gives up.
    async fn serve_once(
        status_line: &'static str,
        response: Option<&'static str>,
    ) -> (String, oneshot::Receiver<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api.php", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let (head, body) = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let head = text[..end].to_string();
                    let length = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.trim()
                                .eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    let body = &buf[end + 4..];
                    if body.len() >= length {
                        break (head, String::from_utf8_lossy(&body[..length]).to_string());
                    }
                }
            };

            let _ = tx.send(CapturedRequest { head, body });

            match response {
                Some(json) => {
                    let reply = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_line,
                        json.len(),
                        json
                    );
                    socket.write_all(reply.as_bytes()).await.unwrap();
                    socket.shutdown().await.ok();
                }
                None => {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
            }
        });

        (url, rx)
    }

    fn client_for(url: &str, timeout_secs: u64) -> CoinPaymentsClient {
        let settings = GatewaySettings {
            sandbox_url: url.to_string(),
            timeout_secs,
            ..Default::default()
        };
        CoinPaymentsClient::new(settings).unwrap()
    }

    fn credentials() -> GatewayCredentials {
        GatewayCredentials {
            public_key: "pubkey".to_string(),
            private_key: Secret::new("privkey".to_string()),
        }
    }

    #[tokio::test]
    async fn test_account_info_is_signed_and_decoded() {
        let (url, captured) = serve_once(
            "200 OK",
            Some(r#"{"error":"ok","result":{"username":"shop","merchant_id":"M-1","email":"shop@example.com","public_name":"Shop"}}"#),
        )
        .await;
        let client = client_for(&url, 5);

        let info = client
            .get_account_info(&credentials(), Environment::Sandbox)
            .await
            .unwrap();
        assert_eq!(info.merchant_id, "M-1");
        assert_eq!(info.username, "shop");

        let request = captured.await.unwrap();
        assert!(request.head.starts_with("POST /api.php"));
        let hmac = request
            .head
            .lines()
            .find_map(|line| line.strip_prefix("hmac: ").or_else(|| line.strip_prefix("HMAC: ")))
            .expect("HMAC header sent");
        assert_eq!(hmac.trim().len(), 128);
        assert_eq!(request.body, "version=1&cmd=get_basic_info&key=pubkey&format=json");
    }

    #[tokio::test]
    async fn test_create_transaction_passes_decline_through() {
        let (url, captured) = serve_once("200 OK", Some(r#"{"error":"Amount too small","result":[]}"#)).await;
        let client = client_for(&url, 5);

        let request = CreateTransactionRequest {
            amount: 0.5,
            currency_price: "USD".to_string(),
            currency_transfer: "BTC".to_string(),
            callback_url: Some("https://shop.example.com/continue".to_string()),
            custom: Some("buyer@example.com".to_string()),
            buyer_email: None,
        };
        let response = client
            .create_transaction(&credentials(), Environment::Sandbox, &request)
            .await
            .unwrap();
        assert_eq!(response.status, "Amount too small");
        assert!(response.result.is_none());

        let sent = captured.await.unwrap();
        assert!(sent.body.contains("cmd=create_transaction"));
        assert!(sent.body.contains("amount=0.5"));
        assert!(sent.body.contains("currency1=USD"));
        assert!(sent.body.contains("currency2=BTC"));
        assert!(sent.body.contains("custom=buyer%40example.com"));
        assert!(!sent.body.contains("buyer_email"));
    }

    #[tokio::test]
    async fn test_create_transaction_ok() {
        let (url, _captured) = serve_once(
            "200 OK",
            Some(r#"{"error":"ok","result":{"amount":"0.01","txn_id":"CPTXID123","address":"addr","confirms_needed":"2","timeout":9000,"checkout_url":"https://example.com/checkout","status_url":"https://example.com/status","qrcode_url":"https://example.com/qr"}}"#),
        )
        .await;
        let client = client_for(&url, 5);

        let request = CreateTransactionRequest {
            amount: 10.0,
            currency_price: "USD".to_string(),
            currency_transfer: "BTC".to_string(),
            callback_url: None,
            custom: None,
            buyer_email: None,
        };
        let response = client
            .create_transaction(&credentials(), Environment::Sandbox, &request)
            .await
            .unwrap();
        assert_eq!(response.status, "ok");
        let created = response.result.unwrap();
        assert_eq!(created.transaction_id, "CPTXID123");
        assert_eq!(created.address.as_deref(), Some("addr"));
    }

    #[tokio::test]
    async fn test_transaction_info_mapping() {
        let (url, captured) = serve_once(
            "200 OK",
            Some(r#"{"error":"ok","result":{"time_created":1,"time_expires":2,"status":100,"status_text":"Complete","type":"coins","coin":"BTC","amount":1250000,"amountf":"0.01250000","received":1250000,"receivedf":"0.01250000","recv_confirms":3,"payment_address":"addr"}}"#),
        )
        .await;
        let client = client_for(&url, 5);

        let info = client
            .get_transaction_info(&credentials(), Environment::Sandbox, "CPTXID123")
            .await
            .unwrap();
        assert_eq!(info.coin, "BTC");
        assert_eq!(info.payment_address, "addr");
        assert_eq!(info.status_text, "Complete");
        assert_eq!(info.kind, "coins");
        assert_eq!(info.confirmations, 3);
        assert_eq!(info.amount_received, 0.0125);

        let sent = captured.await.unwrap();
        assert!(sent.body.ends_with("txid=CPTXID123"));
    }

    #[tokio::test]
    async fn test_rejected_read_is_gateway_error() {
        let (url, _captured) = serve_once("200 OK", Some(r#"{"error":"Invalid API key","result":[]}"#)).await;
        let client = client_for(&url, 5);

        let result = client
            .get_transaction_info(&credentials(), Environment::Sandbox, "CPTXID123")
            .await;
        assert!(matches!(result, Err(GatewayError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let (url, _captured) = serve_once("503 Service Unavailable", Some("{}")).await;
        let client = client_for(&url, 5);

        match client.get_account_info(&credentials(), Environment::Sandbox).await {
            Err(err @ GatewayError::HttpStatus { status: 503 }) => assert!(err.is_retryable()),
            other => panic!("expected HTTP 503, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_gateway_error() {
        let (url, _captured) = serve_once("200 OK", None).await;
        let client = client_for(&url, 1);

        match client.get_account_info(&credentials(), Environment::Sandbox).await {
            Err(GatewayError::Timeout { seconds }) => assert_eq!(seconds, 1),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
