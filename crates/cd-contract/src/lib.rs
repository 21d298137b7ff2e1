//! Typed bindings for the deployed Crypto Devs contract.
//!
//! `ContractReader` issues `eth_call`s through a provider handle;
//! `ContractWriter` submits through a signer handle and blocks until the
//! transaction is mined. Both acquire a fresh handle per call so the
//! connector's network gate runs every time.

pub mod abi;

use alloy_primitives::{Address, U256};
use cd_chain_client::{DappError, TxReceipt, TxRequest, WalletConnector, hex_data};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 0.01 ether, charged by both mint functions.
pub const MINT_PRICE_WEI: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

pub struct ContractReader {
    connector: Arc<WalletConnector>,
    address: Address,
}

impl ContractReader {
    pub fn new(connector: Arc<WalletConnector>, address: Address) -> Self {
        Self { connector, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn call(&self, signature: &str) -> Result<Vec<u8>, DappError> {
        let provider = self.connector.provider().await?;
        let out = provider
            .call(self.address, &abi::encode_call(signature))
            .await?;
        Ok(out.to_vec())
    }

    pub async fn owner(&self) -> Result<Address, DappError> {
        abi::decode_address(&self.call(abi::OWNER).await?)
    }

    pub async fn is_presale_started(&self) -> Result<bool, DappError> {
        abi::decode_bool(&self.call(abi::PRESALE_STARTED).await?)
    }

    /// Unix timestamp (seconds) at which presale closes.
    pub async fn presale_end_time(&self) -> Result<U256, DappError> {
        abi::decode_uint(&self.call(abi::PRESALE_ENDED).await?)
    }

    pub async fn minted_count(&self) -> Result<U256, DappError> {
        abi::decode_uint(&self.call(abi::TOKEN_IDS).await?)
    }
}

pub struct ContractWriter {
    connector: Arc<WalletConnector>,
    address: Address,
    confirm_every: Duration,
}

impl ContractWriter {
    pub fn new(connector: Arc<WalletConnector>, address: Address, confirm_every: Duration) -> Self {
        Self {
            connector,
            address,
            confirm_every,
        }
    }

    async fn submit(&self, signature: &str, value: U256) -> Result<TxReceipt, DappError> {
        let signer = self.connector.signer().await?;
        let pending = signer
            .send_transaction(&TxRequest {
                to: self.address,
                data: abi::encode_call(signature),
                value,
            })
            .await?;
        info!(
            "{} submitted by {} as {}",
            signature,
            signer.address(),
            hex_data(pending.tx_hash().as_slice())
        );

        let receipt = pending.wait(self.confirm_every).await?;
        info!(
            "{} confirmed in block {:?}",
            signature, receipt.block_number
        );
        Ok(receipt)
    }

    /// Owner only; the contract rejects anyone else.
    pub async fn start_presale(&self) -> Result<TxReceipt, DappError> {
        self.submit(abi::START_PRESALE, U256::ZERO).await
    }

    pub async fn presale_mint(&self) -> Result<TxReceipt, DappError> {
        self.submit(abi::PRESALE_MINT, MINT_PRICE_WEI).await
    }

    pub async fn public_sale_mint(&self) -> Result<TxReceipt, DappError> {
        self.submit(abi::MINT, MINT_PRICE_WEI).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi::{address_word, bool_word, selector, uint_word};
    use alloy_primitives::address;
    use cd_chain_client::mock::MockWallet;
    use cd_chain_client::{RINKEBY, WalletProvider};

    const ACCOUNT: Address = address!("00000000000000000000000000000000000000aa");
    const CONTRACT: Address = address!("00000000000000000000000000000000000000cc");

    fn connector(wallet: &Arc<MockWallet>) -> Arc<WalletConnector> {
        Arc::new(WalletConnector::new(
            Some(wallet.clone() as Arc<dyn WalletProvider>),
            RINKEBY,
        ))
    }

    #[test]
    fn mint_price_is_one_hundredth_of_an_ether() {
        let ether = U256::from(10_u64).pow(U256::from(18_u64));
        assert_eq!(MINT_PRICE_WEI * U256::from(100_u64), ether);
    }

    #[tokio::test]
    async fn reader_decodes_contract_state() -> anyhow::Result<()> {
        let wallet = Arc::new(MockWallet::new(4, ACCOUNT));
        wallet.set_call_result(selector(abi::OWNER), address_word(ACCOUNT));
        wallet.set_call_result(selector(abi::PRESALE_STARTED), bool_word(true));
        wallet.set_call_result(selector(abi::PRESALE_ENDED), uint_word(U256::from(1_700_000_000_u64)));
        wallet.set_call_result(selector(abi::TOKEN_IDS), uint_word(U256::from(7_u64)));

        let reader = ContractReader::new(connector(&wallet), CONTRACT);
        assert_eq!(reader.owner().await?, ACCOUNT);
        assert!(reader.is_presale_started().await?);
        assert_eq!(reader.presale_end_time().await?, U256::from(1_700_000_000_u64));
        assert_eq!(reader.minted_count().await?, U256::from(7_u64));
        Ok(())
    }

    #[tokio::test]
    async fn reader_failure_is_rpc_error() {
        let wallet = Arc::new(MockWallet::new(4, ACCOUNT));
        wallet.fail_call(selector(abi::TOKEN_IDS), "node unavailable");
        let reader = ContractReader::new(connector(&wallet), CONTRACT);
        assert!(matches!(reader.minted_count().await, Err(DappError::Rpc(_))));
    }

    #[tokio::test]
    async fn mints_pay_the_mint_price() -> anyhow::Result<()> {
        let wallet = Arc::new(MockWallet::new(4, ACCOUNT));
        let writer = ContractWriter::new(connector(&wallet), CONTRACT, Duration::from_millis(1));

        writer.presale_mint().await?;
        writer.public_sale_mint().await?;
        writer.start_presale().await?;

        let sent = wallet.sent_transactions();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0]["data"], hex_data(&selector(abi::PRESALE_MINT)));
        assert_eq!(sent[0]["value"], "0x2386f26fc10000");
        assert_eq!(sent[1]["data"], hex_data(&selector(abi::MINT)));
        assert_eq!(sent[1]["value"], "0x2386f26fc10000");
        assert_eq!(sent[2]["value"], "0x0");
        assert_eq!(sent[2]["to"], CONTRACT.to_string());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_submission_is_transaction_error() {
        let wallet = Arc::new(MockWallet::new(4, ACCOUNT));
        wallet.fail_sends(Some("user rejected the request"));
        let writer = ContractWriter::new(connector(&wallet), CONTRACT, Duration::from_millis(1));
        assert!(matches!(
            writer.public_sale_mint().await,
            Err(DappError::Transaction(_))
        ));
    }
}
