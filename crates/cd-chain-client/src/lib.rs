use alloy_primitives::{Address, B256, Bytes, U256, hex};
use async_trait::async_trait;
use cd_api_types::{ChainId, InFlight};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// The only network the Crypto Devs contract is deployed on.
pub const RINKEBY: ChainId = ChainId(4);
pub const RINKEBY_NAME: &str = "Rinkeby";

#[derive(Debug, Error)]
pub enum DappError {
    #[error("no wallet available: {0}")]
    NoWallet(String),
    #[error("wrong network: expected chain {expected}, wallet is on chain {actual}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("transaction error: {0}")]
    Transaction(String),
    #[error("another action is in flight: {0:?}")]
    Busy(InFlight),
}

/// EIP-1193 style wallet: one `request(method, params)` entry point.
///
/// The wallet owns the keys. Transactions are signed on its side of the
/// seam through `eth_sendTransaction`.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value>;
}

/// Hands out provider and signer handles, re-checking the wallet's network
/// on every acquisition.
pub struct WalletConnector {
    wallet: Option<Arc<dyn WalletProvider>>,
    expected_chain: ChainId,
}

impl WalletConnector {
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>, expected_chain: ChainId) -> Self {
        Self {
            wallet,
            expected_chain,
        }
    }

    pub fn expected_chain(&self) -> ChainId {
        self.expected_chain
    }

    fn wallet(&self) -> Result<&Arc<dyn WalletProvider>, DappError> {
        self.wallet
            .as_ref()
            .ok_or_else(|| DappError::NoWallet("no wallet provider configured".to_owned()))
    }

    /// Asks the wallet to expose its accounts, then gates on the network.
    pub async fn connect(&self) -> Result<ProviderHandle, DappError> {
        let wallet = self.wallet()?;
        let accounts = wallet
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(|err| DappError::NoWallet(format!("{} did not respond: {err:#}", wallet.name())))?;

        if parse_accounts(&accounts)?.is_empty() {
            return Err(DappError::NoWallet(format!(
                "{} exposes no accounts",
                wallet.name()
            )));
        }

        self.provider().await
    }

    pub async fn provider(&self) -> Result<ProviderHandle, DappError> {
        let wallet = Arc::clone(self.wallet()?);
        let chain_id = self.ensure_network(wallet.as_ref()).await?;
        Ok(ProviderHandle { wallet, chain_id })
    }

    pub async fn signer(&self) -> Result<SignerHandle, DappError> {
        let provider = self.provider().await?;
        let accounts = provider.request("eth_accounts", json!([])).await?;
        let address = parse_accounts(&accounts)?
            .into_iter()
            .next()
            .ok_or_else(|| DappError::NoWallet("wallet exposes no accounts".to_owned()))?;
        Ok(SignerHandle { provider, address })
    }

    async fn ensure_network(&self, wallet: &dyn WalletProvider) -> Result<ChainId, DappError> {
        let raw = wallet
            .request("eth_chainId", json!([]))
            .await
            .map_err(|err| DappError::NoWallet(format!("{} did not respond: {err:#}", wallet.name())))?;
        let actual = parse_quantity(&raw)?;

        if actual != self.expected_chain.0 {
            warn!(
                "wallet {} is on chain {}, expected {}",
                wallet.name(),
                actual,
                self.expected_chain.0
            );
            return Err(DappError::WrongNetwork {
                expected: self.expected_chain.0,
                actual,
            });
        }

        Ok(ChainId(actual))
    }
}

/// Read-only access to chain state through the connected wallet.
#[derive(Clone)]
pub struct ProviderHandle {
    wallet: Arc<dyn WalletProvider>,
    chain_id: ChainId,
}

impl ProviderHandle {
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, DappError> {
        self.wallet
            .request(method, params)
            .await
            .map_err(|err| DappError::Rpc(format!("{method}: {err:#}")))
    }

    pub async fn call(&self, to: Address, data: &[u8]) -> Result<Bytes, DappError> {
        let params = json!([{ "to": to.to_string(), "data": hex_data(data) }, "latest"]);
        let raw = self.request("eth_call", params).await?;
        parse_bytes(&raw)
    }

    pub async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, DappError> {
        let raw = self
            .request("eth_getTransactionReceipt", json!([hex_data(tx_hash.as_slice())]))
            .await?;
        if raw.is_null() {
            return Ok(None);
        }
        TxReceipt::from_json(&raw).map(Some)
    }
}

#[derive(Debug, Clone)]
pub struct TxRequest {
    pub to: Address,
    pub data: Vec<u8>,
    pub value: U256,
}

/// A provider bound to the wallet account that will sign.
#[derive(Clone)]
pub struct SignerHandle {
    provider: ProviderHandle,
    address: Address,
}

impl SignerHandle {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    pub async fn send_transaction(&self, tx: &TxRequest) -> Result<PendingTransaction, DappError> {
        let params = json!([{
            "from": self.address.to_string(),
            "to": tx.to.to_string(),
            "data": hex_data(&tx.data),
            "value": format!("0x{:x}", tx.value),
        }]);

        let raw = self
            .provider
            .wallet
            .request("eth_sendTransaction", params)
            .await
            .map_err(|err| DappError::Transaction(format!("eth_sendTransaction: {err:#}")))?;

        let tx_hash = parse_hash(&raw).map_err(|err| DappError::Transaction(err.to_string()))?;
        debug!("submitted transaction {}", hex_data(tx_hash.as_slice()));

        Ok(PendingTransaction {
            provider: self.provider.clone(),
            tx_hash,
        })
    }
}

pub struct PendingTransaction {
    provider: ProviderHandle,
    tx_hash: B256,
}

impl PendingTransaction {
    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    /// Polls for the receipt until the transaction is mined. Transport
    /// errors while fetching are retried; only a revert fails the wait.
    pub async fn wait(self, poll_every: Duration) -> Result<TxReceipt, DappError> {
        loop {
            let receipt = match self.provider.transaction_receipt(self.tx_hash).await {
                Ok(receipt) => receipt,
                // A failed fetch says nothing about the transaction itself.
                Err(DappError::Rpc(err)) => {
                    warn!(
                        "receipt for {} unavailable, retrying: {}",
                        hex_data(self.tx_hash.as_slice()),
                        err
                    );
                    None
                }
                Err(err) => return Err(err),
            };

            match receipt {
                Some(receipt) if receipt.success => return Ok(receipt),
                Some(_) => {
                    return Err(DappError::Transaction(format!(
                        "transaction {} reverted",
                        hex_data(self.tx_hash.as_slice())
                    )));
                }
                None => tokio::time::sleep(poll_every).await,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub success: bool,
}

impl TxReceipt {
    fn from_json(raw: &Value) -> Result<Self, DappError> {
        let tx_hash = parse_hash(&raw["transactionHash"])?;
        let block_number = match &raw["blockNumber"] {
            Value::Null => None,
            other => Some(parse_quantity(other)?),
        };
        // Pre-Byzantium receipts carry no status; treat them as mined.
        let success = match &raw["status"] {
            Value::Null => true,
            other => parse_quantity(other)? == 1,
        };
        Ok(Self {
            tx_hash,
            block_number,
            success,
        })
    }
}

pub fn hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn strip_hex(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}

pub fn parse_quantity(raw: &Value) -> Result<u64, DappError> {
    if let Some(number) = raw.as_u64() {
        return Ok(number);
    }
    let text = raw
        .as_str()
        .ok_or_else(|| DappError::Rpc(format!("expected hex quantity, got {raw}")))?;
    u64::from_str_radix(strip_hex(text), 16)
        .map_err(|err| DappError::Rpc(format!("invalid quantity {text}: {err}")))
}

pub fn parse_bytes(raw: &Value) -> Result<Bytes, DappError> {
    let text = raw
        .as_str()
        .ok_or_else(|| DappError::Rpc(format!("expected hex data, got {raw}")))?;
    hex::decode(strip_hex(text))
        .map(Bytes::from)
        .map_err(|err| DappError::Rpc(format!("invalid hex data: {err}")))
}

fn parse_hash(raw: &Value) -> Result<B256, DappError> {
    let bytes = parse_bytes(raw)?;
    if bytes.len() != 32 {
        return Err(DappError::Rpc(format!(
            "expected 32-byte hash, got {} bytes",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

fn parse_accounts(raw: &Value) -> Result<Vec<Address>, DappError> {
    let entries = raw
        .as_array()
        .ok_or_else(|| DappError::Rpc(format!("expected account list, got {raw}")))?;
    entries
        .iter()
        .map(|entry| {
            let text = entry
                .as_str()
                .ok_or_else(|| DappError::Rpc(format!("expected address, got {entry}")))?;
            text.parse::<Address>()
                .map_err(|err| DappError::Rpc(format!("invalid address {text}: {err}")))
        })
        .collect()
}
