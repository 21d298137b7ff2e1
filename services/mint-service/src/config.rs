use alloy_primitives::Address;
use anyhow::{Context, Result, anyhow};
use cd_chain_rpc::DEFAULT_WALLET_URL;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub(crate) struct ServiceConfig {
    pub(crate) listen_addr: SocketAddr,
    /// `None` when the operator explicitly configured no wallet.
    pub(crate) wallet_url: Option<String>,
    pub(crate) contract_address: Address,
    pub(crate) poll_interval: Duration,
    pub(crate) confirm_interval: Duration,
    pub(crate) asset_dir: PathBuf,
}

impl ServiceConfig {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = lookup("CRYPTODEVS_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_owned())
            .parse::<SocketAddr>()
            .context("CRYPTODEVS_LISTEN_ADDR must be host:port")?;

        let wallet_url = match lookup("CRYPTODEVS_WALLET_URL") {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url.trim().to_owned()),
            None => Some(DEFAULT_WALLET_URL.to_owned()),
        };

        let contract_address = lookup("CRYPTODEVS_CONTRACT_ADDRESS")
            .ok_or_else(|| anyhow!("CRYPTODEVS_CONTRACT_ADDRESS is required"))?
            .trim()
            .parse::<Address>()
            .context("CRYPTODEVS_CONTRACT_ADDRESS must be a 20-byte hex address")?;

        let poll_secs = parse_number(&lookup, "CRYPTODEVS_POLL_INTERVAL_SECS", 5)?;
        if poll_secs == 0 {
            return Err(anyhow!("CRYPTODEVS_POLL_INTERVAL_SECS must be greater than 0"));
        }
        let confirm_ms = parse_number(&lookup, "CRYPTODEVS_CONFIRM_INTERVAL_MS", 1_000)?;

        let asset_dir = lookup("CRYPTODEVS_ASSET_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("public"));

        Ok(Self {
            listen_addr,
            wallet_url,
            contract_address,
            poll_interval: Duration::from_secs(poll_secs),
            confirm_interval: Duration::from_millis(confirm_ms.max(1)),
            asset_dir,
        })
    }
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number")),
        None => Ok(default),
    }
}
