use futures_util::{SinkExt, StreamExt};
use gateway::{GatewayError, JsonRpcGateway, WalletGateway};
use progression::Amount;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

const WALLET: &str = "0x00000000000000000000000000000000000000aa";
const USER: &str = "0x00000000000000000000000000000000000000BB";

/// Serve one JSON-RPC request per connection, answering with `respond`.
async fn spawn_node<F>(respond: F) -> (String, tokio::sync::mpsc::UnboundedReceiver<Value>)
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = tokio::sync::mpsc::unbounded_channel();
    let respond = std::sync::Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let respond = respond.clone();
            let seen_tx = seen_tx.clone();
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                if let Some(Ok(Message::Text(text))) = ws.next().await {
                    let request: Value = serde_json::from_str(&text).unwrap();
                    let mut response = (*respond)(&request);
                    response["jsonrpc"] = json!("2.0");
                    response["id"] = request["id"].clone();
                    let _ = seen_tx.send(request);
                    let _ = ws.send(Message::Text(response.to_string())).await;
                }
            });
        }
    });

    (format!("ws://{}", addr), seen_rx)
}

#[tokio::test]
async fn test_get_balance_parses_hex_wei() {
    let (url, mut seen) = spawn_node(|_| json!({ "result": "0xb1a2bc2ec50000" })).await;
    let gateway = JsonRpcGateway::new(&url, WALLET, Duration::from_secs(5)).unwrap();

    let balance = gateway.get_balance().await.unwrap();
    assert_eq!(balance, "0.05".parse::<Amount>().unwrap());

    let request = seen.recv().await.unwrap();
    assert_eq!(request["method"], "eth_getBalance");
    assert_eq!(request["params"], json!([WALLET, "latest"]));
}

#[tokio::test]
async fn test_send_native_builds_value_transfer() {
    let hash = format!("0x{}", "12".repeat(32));
    let reply = hash.clone();
    let (url, mut seen) = spawn_node(move |_| json!({ "result": reply })).await;
    let gateway = JsonRpcGateway::new(&url, WALLET, Duration::from_secs(5)).unwrap();

    let tx = gateway.send_native(USER, "0.03".parse().unwrap()).await.unwrap();
    assert_eq!(tx.as_str(), hash);

    let request = seen.recv().await.unwrap();
    assert_eq!(request["method"], "eth_sendTransaction");
    let params = &request["params"][0];
    assert_eq!(params["from"], WALLET);
    assert_eq!(params["to"], USER.to_lowercase());
    assert_eq!(params["value"], "0x6a94d74f430000");
    assert_eq!(params["gas"], "0x5208");
}

#[tokio::test]
async fn test_rpc_error_is_surfaced() {
    let (url, _seen) = spawn_node(|_| json!({ "error": { "code": -32000, "message": "insufficient funds for transfer" } })).await;
    let gateway = JsonRpcGateway::new(&url, WALLET, Duration::from_secs(5)).unwrap();

    let err = gateway.send_native(USER, "1".parse().unwrap()).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Rpc {
            code: -32000,
            message: "insufficient funds for transfer".to_string()
        }
    );
}

#[tokio::test]
async fn test_silent_node_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept the handshake, then never answer.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let gateway = JsonRpcGateway::new(&format!("ws://{}", addr), WALLET, Duration::from_millis(200)).unwrap();
    let err = gateway.get_balance().await.unwrap_err();
    assert_eq!(err, GatewayError::Timeout(200));
}

#[tokio::test]
async fn test_unreachable_node_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = JsonRpcGateway::new(&format!("ws://{}", addr), WALLET, Duration::from_secs(2)).unwrap();
    let err = gateway.get_balance().await.unwrap_err();
    assert!(matches!(err, GatewayError::Network(_)));
}
