//! WebSocket JSON-RPC gateway to an Ethereum-style node that manages the
//! custodial account's key.

use crate::address::normalize_address;
use crate::error::{GatewayError, GatewayResult};
use crate::wallet::{TxHash, WalletGateway};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use progression::Amount;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};

/// Gas limit of a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    id: Option<u64>,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

pub struct JsonRpcGateway {
    url: String,
    from: String,
    request_timeout: Duration,
    next_id: parking_lot::Mutex<u64>,
    send_lock: Mutex<()>,
}

impl JsonRpcGateway {
    pub fn new(url: &str, from: &str, request_timeout: Duration) -> GatewayResult<Self> {
        let parsed = url::Url::parse(url).map_err(|e| GatewayError::Config(format!("invalid gateway url {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(GatewayError::Config(format!(
                "gateway url must use ws:// or wss://, got {}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            url: url.to_string(),
            from: normalize_address(from)?,
            request_timeout,
            next_id: parking_lot::Mutex::new(1),
            send_lock: Mutex::new(()),
        })
    }

    fn next_id(&self) -> u64 {
        let mut next_id = self.next_id.lock();
        let id = *next_id;
        *next_id += 1;
        id
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> GatewayResult<serde_json::Value> {
        let timeout_ms = self.request_timeout.as_millis() as u64;
        tokio::time::timeout(self.request_timeout, self.round_trip(method, params))
            .await
            .map_err(|_| GatewayError::Timeout(timeout_ms))?
    }

    async fn round_trip(&self, method: &str, params: serde_json::Value) -> GatewayResult<serde_json::Value> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| GatewayError::Network(format!("WebSocket connection failed: {}", e)))?;

        let (mut write, mut read) = ws_stream.split();

        let id = self.next_id();
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| GatewayError::InvalidResponse(format!("Request serialization failed: {}", e)))?;

        debug!("-> {} (id {})", method, id);
        write
            .send(Message::Text(request_json))
            .await
            .map_err(|e| GatewayError::Network(format!("Send failed: {}", e)))?;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let response: JsonRpcResponse = serde_json::from_str(&text)
                        .map_err(|e| GatewayError::InvalidResponse(format!("Response parsing failed: {}", e)))?;

                    if response.id != Some(id) {
                        continue;
                    }

                    let _ = write.send(Message::Close(None)).await;

                    if let Some(error) = response.error {
                        return Err(GatewayError::Rpc {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    return Ok(response.result);
                }
                Ok(Message::Close(_)) => break,
                Err(e) => return Err(GatewayError::Network(format!("WebSocket error: {}", e))),
                _ => continue,
            }
        }

        Err(GatewayError::Network("Connection closed without response".to_string()))
    }
}

#[async_trait]
impl WalletGateway for JsonRpcGateway {
    fn address(&self) -> &str {
        &self.from
    }

    async fn get_balance(&self) -> GatewayResult<Amount> {
        let result = self
            .call_method("eth_getBalance", serde_json::json!([self.from, "latest"]))
            .await?;
        let quantity = result
            .as_str()
            .ok_or_else(|| GatewayError::InvalidResponse(format!("balance is not a string: {}", result)))?;
        Ok(Amount::from_wei(parse_quantity(quantity)?))
    }

    async fn send_native(&self, to: &str, amount: Amount) -> GatewayResult<TxHash> {
        let to = normalize_address(to)?;
        let _guard = self.send_lock.lock().await;

        let params = serde_json::json!([{
            "from": self.from,
            "to": to,
            "value": format_quantity(amount.wei()),
            "gas": format_quantity(TRANSFER_GAS as u128),
        }]);
        let result = self.call_method("eth_sendTransaction", params).await?;

        let hash = result
            .as_str()
            .ok_or_else(|| GatewayError::InvalidResponse(format!("transaction hash is not a string: {}", result)))?;
        let hash = parse_tx_hash(hash)?;

        info!("Submitted transfer of {} to {}: {}", amount, to, hash);
        Ok(hash)
    }
}

/// `0x`-prefixed hex quantity, as used for balances and values.
pub fn format_quantity(value: u128) -> String {
    format!("{:#x}", value)
}

pub fn parse_quantity(quantity: &str) -> GatewayResult<u128> {
    let digits = quantity
        .strip_prefix("0x")
        .ok_or_else(|| GatewayError::InvalidResponse(format!("quantity without 0x prefix: {}", quantity)))?;
    if digits.is_empty() {
        return Err(GatewayError::InvalidResponse("empty quantity".to_string()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| GatewayError::InvalidResponse(format!("invalid quantity {}: {}", quantity, e)))
}

fn parse_tx_hash(hash: &str) -> GatewayResult<TxHash> {
    let digits = hash
        .strip_prefix("0x")
        .ok_or_else(|| GatewayError::InvalidResponse(format!("transaction hash without 0x prefix: {}", hash)))?;
    let bytes = hex::decode(digits).map_err(|e| GatewayError::InvalidResponse(format!("Hex decode error: {}", e)))?;
    if bytes.len() != 32 {
        return Err(GatewayError::InvalidResponse(format!("Invalid hash length: {}", bytes.len())));
    }
    Ok(TxHash::new(hash.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities() {
        assert_eq!(format_quantity(0), "0x0");
        assert_eq!(format_quantity(21_000), "0x5208");
        assert_eq!(parse_quantity("0x5208").unwrap(), 21_000);
        assert_eq!(parse_quantity("0xde0b6b3a7640000").unwrap(), 1_000_000_000_000_000_000);
        assert!(parse_quantity("5208").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xnothex").is_err());
    }

    #[test]
    fn tx_hash_must_be_32_bytes() {
        let good = format!("0x{}", "ab".repeat(32));
        assert_eq!(parse_tx_hash(&good).unwrap().as_str(), good);
        assert!(parse_tx_hash("0xabcd").is_err());
        assert!(parse_tx_hash(&"ab".repeat(32)).is_err());
    }

    #[test]
    fn rejects_non_websocket_urls() {
        let from = "0x00000000000000000000000000000000000000aa";
        assert!(JsonRpcGateway::new("http://localhost:8545", from, Duration::from_secs(1)).is_err());
        assert!(JsonRpcGateway::new("not a url", from, Duration::from_secs(1)).is_err());
        assert!(JsonRpcGateway::new("ws://localhost:8546", "0x12", Duration::from_secs(1)).is_err());

        let gateway = JsonRpcGateway::new("ws://localhost:8546", from, Duration::from_secs(1)).unwrap();
        assert_eq!(gateway.address(), from);
    }
}
