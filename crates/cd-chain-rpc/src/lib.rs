use anyhow::{Context, Result};
use async_trait::async_trait;
use cd_chain_client::WalletProvider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Frame and similar desktop wallets listen here.
pub const DEFAULT_WALLET_URL: &str = "http://127.0.0.1:1248";

/// Wallet reached over HTTP JSON-RPC.
///
/// Reads `CRYPTODEVS_WALLET_URL` from environment at construction time
/// when no endpoint is given (default: `http://127.0.0.1:1248`).
pub struct HttpWalletProvider {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl Default for HttpWalletProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HttpWalletProvider {
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var("CRYPTODEVS_WALLET_URL").ok())
            .unwrap_or_else(|| DEFAULT_WALLET_URL.to_string());
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// ── JSON-RPC 2.0 envelope ────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_result(self) -> Result<Value> {
        if let Some(err) = self.error {
            anyhow::bail!("rpc error {}: {}", err.code, err.message);
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("-> {} #{}", method, body.id);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{method} transport"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("{method} HTTP {status}: {text}");
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .with_context(|| format!("{method} parse"))?;

        envelope.into_result()
    }
}
