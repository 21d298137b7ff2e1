//! Scripted in-memory wallet.
//!
//! Answers the handful of JSON-RPC methods the connector and contract
//! bindings use. `eth_call` results are keyed by 4-byte selector. An
//! accepted transaction can rewrite a call result to model contract state
//! changing after a write.

use crate::{WalletProvider, hex_data};
use alloy_primitives::{Address, hex};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

type Selector = [u8; 4];

pub struct MockWallet {
    chain_id: AtomicU64,
    accounts: Vec<Address>,
    available: AtomicBool,
    revert: AtomicBool,
    pending_receipts: AtomicU32,
    failing_receipts: AtomicU32,
    tx_counter: AtomicU64,
    call_results: Mutex<HashMap<Selector, Result<Vec<u8>, String>>>,
    confirm_effects: Mutex<HashMap<Selector, (Selector, Vec<u8>)>>,
    send_failure: Mutex<Option<String>>,
    requests: Mutex<Vec<String>>,
    sent: Mutex<Vec<Value>>,
}

impl MockWallet {
    pub fn new(chain_id: u64, account: Address) -> Self {
        Self::with_accounts(chain_id, vec![account])
    }

    pub fn without_accounts(chain_id: u64) -> Self {
        Self::with_accounts(chain_id, Vec::new())
    }

    fn with_accounts(chain_id: u64, accounts: Vec<Address>) -> Self {
        Self {
            chain_id: AtomicU64::new(chain_id),
            accounts,
            available: AtomicBool::new(true),
            revert: AtomicBool::new(false),
            pending_receipts: AtomicU32::new(0),
            failing_receipts: AtomicU32::new(0),
            tx_counter: AtomicU64::new(0),
            call_results: Mutex::new(HashMap::new()),
            confirm_effects: Mutex::new(HashMap::new()),
            send_failure: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_revert(&self, revert: bool) {
        self.revert.store(revert, Ordering::SeqCst);
    }

    /// Number of `null` receipts returned before each transaction is mined.
    pub fn set_pending_receipts(&self, count: u32) {
        self.pending_receipts.store(count, Ordering::SeqCst);
    }

    /// Number of receipt fetches that fail with a transport error.
    pub fn fail_receipts(&self, count: u32) {
        self.failing_receipts.store(count, Ordering::SeqCst);
    }

    pub fn set_call_result(&self, selector: Selector, data: Vec<u8>) {
        lock(&self.call_results).insert(selector, Ok(data));
    }

    pub fn fail_call(&self, selector: Selector, message: &str) {
        lock(&self.call_results).insert(selector, Err(message.to_owned()));
    }

    /// Every `eth_sendTransaction` fails with `message` until cleared.
    pub fn fail_sends(&self, message: Option<&str>) {
        *lock(&self.send_failure) = message.map(ToOwned::to_owned);
    }

    /// Once a non-reverting transaction calling `tx_selector` is accepted,
    /// `call_selector` starts returning `data`.
    pub fn on_confirm(&self, tx_selector: Selector, call_selector: Selector, data: Vec<u8>) {
        lock(&self.confirm_effects).insert(tx_selector, (call_selector, data));
    }

    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    pub fn count(&self, method: &str) -> usize {
        let tagged = format!("{method}:");
        lock(&self.requests)
            .iter()
            .filter(|m| m.as_str() == method || m.starts_with(&tagged))
            .count()
    }

    /// Number of `eth_call`s made against `selector`.
    pub fn call_count(&self, selector: Selector) -> usize {
        let tag = format!("eth_call:{}", hex::encode(selector));
        lock(&self.requests).iter().filter(|m| **m == tag).count()
    }

    pub fn sent_transactions(&self) -> Vec<Value> {
        lock(&self.sent).clone()
    }

    fn handle_call(&self, params: &Value) -> anyhow::Result<Value> {
        let selector = selector_of(&params[0]["data"])?;
        lock(&self.requests).push(format!("eth_call:{}", hex::encode(selector)));
        match lock(&self.call_results).get(&selector) {
            Some(Ok(data)) => Ok(json!(hex_data(data))),
            Some(Err(message)) => bail!("execution reverted: {message}"),
            None => bail!("no scripted result for selector 0x{}", hex::encode(selector)),
        }
    }

    fn handle_send(&self, params: &Value) -> anyhow::Result<Value> {
        if let Some(message) = lock(&self.send_failure).clone() {
            bail!("{message}");
        }
        let tx = params[0].clone();
        let selector = selector_of(&tx["data"])?;
        lock(&self.sent).push(tx);

        if !self.revert.load(Ordering::SeqCst) {
            if let Some((call_selector, data)) = lock(&self.confirm_effects).get(&selector).cloned() {
                self.set_call_result(call_selector, data);
            }
        }

        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!(format!("0x{n:064x}")))
    }

    fn handle_receipt(&self, params: &Value) -> anyhow::Result<Value> {
        let failing = self.failing_receipts.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_receipts.store(failing - 1, Ordering::SeqCst);
            bail!("connection reset by peer");
        }
        let pending = self.pending_receipts.load(Ordering::SeqCst);
        if pending > 0 {
            self.pending_receipts.store(pending - 1, Ordering::SeqCst);
            return Ok(Value::Null);
        }
        let status = if self.revert.load(Ordering::SeqCst) { "0x0" } else { "0x1" };
        Ok(json!({
            "transactionHash": params[0].clone(),
            "blockNumber": "0x1",
            "status": status,
        }))
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn name(&self) -> &str {
        "mock-wallet"
    }

    async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        if !self.available.load(Ordering::SeqCst) {
            bail!("connection refused");
        }

        if method == "eth_call" {
            return self.handle_call(&params);
        }
        lock(&self.requests).push(method.to_owned());

        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!(
                self.accounts.iter().map(ToString::to_string).collect::<Vec<_>>()
            )),
            "eth_chainId" => Ok(json!(format!("{:#x}", self.chain_id.load(Ordering::SeqCst)))),
            "eth_sendTransaction" => self.handle_send(&params),
            "eth_getTransactionReceipt" => self.handle_receipt(&params),
            other => Err(anyhow!("method {other} not supported by mock wallet")),
        }
    }
}

fn selector_of(data: &Value) -> anyhow::Result<Selector> {
    let text = data.as_str().ok_or_else(|| anyhow!("missing call data"))?;
    let bytes = hex::decode(text.trim_start_matches("0x"))?;
    if bytes.len() < 4 {
        bail!("call data shorter than a selector");
    }
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
