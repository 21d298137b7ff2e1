//! User actions and poll steps against the Crypto Devs contract.
//!
//! Every operation catches its own errors: they are logged, a notice is
//! queued for network mismatches, and state is left as it was. Nothing is
//! retried; the next poll tick or the next click tries again.

use alloy_primitives::Address;
use cd_api_types::{DappStateResponse, InFlight, Notice, NoticeKind, RenderBranch};
use cd_chain_client::{DappError, RINKEBY_NAME, WalletConnector};
use cd_contract::{ContractReader, ContractWriter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::presale::{Clock, presale_has_ended};
use crate::state::{DappState, SharedState};

pub const MINT_SUCCESS_MESSAGE: &str = "You successfully minted a Crypto Dev!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MintKind {
    Presale,
    Public,
}

pub struct Dapp {
    connector: Arc<WalletConnector>,
    reader: ContractReader,
    writer: ContractWriter,
    state: SharedState,
    clock: Arc<dyn Clock>,
}

impl Dapp {
    pub fn new(
        connector: Arc<WalletConnector>,
        contract: Address,
        confirm_every: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader: ContractReader::new(Arc::clone(&connector), contract),
            writer: ContractWriter::new(Arc::clone(&connector), contract, confirm_every),
            connector,
            state: DappState::shared(),
            clock,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub async fn branch(&self) -> RenderBranch {
        self.state.read().await.branch()
    }

    /// Current state, leaving queued notices in place.
    pub async fn snapshot(&self) -> DappStateResponse {
        let state = self.state.read().await;
        state.to_response(state.pending_notices().cloned().collect())
    }

    /// Current state, handing queued notices to the caller exactly once.
    pub async fn take_snapshot(&self) -> DappStateResponse {
        let mut state = self.state.write().await;
        let notices = state.take_notices();
        state.to_response(notices)
    }

    async fn begin(&self, action: InFlight) -> Result<(), DappError> {
        let mut state = self.state.write().await;
        if state.in_flight.is_busy() {
            return Err(DappError::Busy(state.in_flight));
        }
        state.in_flight = action;
        Ok(())
    }

    async fn finish(&self) {
        self.state.write().await.in_flight = InFlight::Idle;
    }

    async fn report(&self, operation: &str, err: &DappError) {
        match err {
            DappError::WrongNetwork { .. } => {
                error!("{operation}: {err}");
                self.state.write().await.push_notice(Notice {
                    kind: NoticeKind::WrongNetwork,
                    message: format!("Change the network to {RINKEBY_NAME}"),
                });
            }
            DappError::Rpc(_) => warn!("{operation}: {err}"),
            _ => error!("{operation}: {err}"),
        }
    }

    pub async fn connect_wallet(&self) -> bool {
        if let Err(err) = self.begin(InFlight::Connecting).await {
            self.report("connect_wallet", &err).await;
            return false;
        }

        let result = match self.connector.connect().await {
            Ok(_) => self.connector.signer().await.map(|signer| signer.address()),
            Err(err) => Err(err),
        };
        self.finish().await;

        match result {
            Ok(account) => {
                info!("wallet connected as {account}");
                let mut state = self.state.write().await;
                state.session.wallet_connected = true;
                state.session.account = Some(account);
                true
            }
            Err(err) => {
                self.report("connect_wallet", &err).await;
                false
            }
        }
    }

    /// Flags the session as owner when the wallet account owns the contract.
    pub async fn check_owner(&self) -> Option<bool> {
        let result = async {
            let owner = self.reader.owner().await?;
            let signer = self.connector.signer().await?;
            Ok::<_, DappError>(signer.address() == owner)
        }
        .await;

        match result {
            Ok(is_owner) => {
                debug!("owner check: {is_owner}");
                self.state.write().await.session.is_owner = is_owner;
                Some(is_owner)
            }
            Err(err) => {
                self.report("check_owner", &err).await;
                None
            }
        }
    }

    pub async fn check_presale_started(&self) -> Option<bool> {
        match self.reader.is_presale_started().await {
            Ok(started) => {
                if !started {
                    self.check_owner().await;
                }
                self.state.write().await.set_presale_started(started);
                Some(started)
            }
            Err(err) => {
                self.report("check_presale_started", &err).await;
                None
            }
        }
    }

    pub async fn check_presale_ended(&self) -> Option<bool> {
        match self.reader.presale_end_time().await {
            Ok(end_timestamp) => {
                let ended = presale_has_ended(end_timestamp, self.clock.now_unix());
                self.state.write().await.set_presale_ended(ended);
                Some(ended)
            }
            Err(err) => {
                self.report("check_presale_ended", &err).await;
                None
            }
        }
    }

    pub async fn refresh_minted_count(&self) -> Option<u64> {
        match self.reader.minted_count().await {
            Ok(count) => {
                let count = u64::try_from(count).unwrap_or(u64::MAX);
                self.state.write().await.minted.token_ids_minted = count;
                Some(count)
            }
            Err(err) => {
                self.report("refresh_minted_count", &err).await;
                None
            }
        }
    }

    pub async fn start_presale(&self) -> bool {
        if let Err(err) = self.begin(InFlight::StartingPresale).await {
            self.report("start_presale", &err).await;
            return false;
        }
        let result = self.writer.start_presale().await;
        self.finish().await;

        match result {
            Ok(_) => {
                info!("presale started");
                self.check_presale_started().await;
                true
            }
            Err(err) => {
                self.report("start_presale", &err).await;
                false
            }
        }
    }

    pub async fn presale_mint(&self) -> bool {
        self.mint(MintKind::Presale).await
    }

    pub async fn public_sale_mint(&self) -> bool {
        self.mint(MintKind::Public).await
    }

    async fn mint(&self, kind: MintKind) -> bool {
        let operation = match kind {
            MintKind::Presale => "presale_mint",
            MintKind::Public => "public_sale_mint",
        };
        if let Err(err) = self.begin(InFlight::Minting).await {
            self.report(operation, &err).await;
            return false;
        }

        let result = match kind {
            MintKind::Presale => self.writer.presale_mint().await,
            MintKind::Public => self.writer.public_sale_mint().await,
        };
        self.finish().await;

        match result {
            Ok(_) => {
                info!("{operation} confirmed");
                self.state.write().await.push_notice(Notice {
                    kind: NoticeKind::MintSuccess,
                    message: MINT_SUCCESS_MESSAGE.to_owned(),
                });
                true
            }
            Err(err) => {
                self.report(operation, &err).await;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presale::ManualClock;
    use alloy_primitives::{U256, address};
    use cd_api_types::PresalePhase;
    use cd_chain_client::mock::MockWallet;
    use cd_chain_client::{RINKEBY, WalletProvider};
    use cd_contract::abi::{self, address_word, bool_word, selector, uint_word};

    const ACCOUNT: Address = address!("00000000000000000000000000000000000000aa");
    const STRANGER: Address = address!("00000000000000000000000000000000000000bb");
    const CONTRACT: Address = address!("00000000000000000000000000000000000000cc");
    const NOW: u64 = 1_700_000_000;

    fn dapp(wallet: &Arc<MockWallet>) -> Dapp {
        let connector = Arc::new(WalletConnector::new(
            Some(wallet.clone() as Arc<dyn WalletProvider>),
            RINKEBY,
        ));
        Dapp::new(
            connector,
            CONTRACT,
            Duration::from_millis(1),
            Arc::new(ManualClock::new(NOW)),
        )
    }

    fn wallet(owner: Address, started: bool) -> Arc<MockWallet> {
        let wallet = Arc::new(MockWallet::new(4, ACCOUNT));
        wallet.set_call_result(selector(abi::OWNER), address_word(owner));
        wallet.set_call_result(selector(abi::PRESALE_STARTED), bool_word(started));
        wallet.set_call_result(selector(abi::PRESALE_ENDED), uint_word(U256::from(NOW + 100)));
        wallet.set_call_result(selector(abi::TOKEN_IDS), uint_word(U256::from(3_u64)));
        wallet
    }

    #[tokio::test]
    async fn owner_before_presale_gets_start_button() {
        let wallet = wallet(ACCOUNT, false);
        let dapp = dapp(&wallet);

        assert!(dapp.connect_wallet().await);
        assert_eq!(dapp.check_presale_started().await, Some(false));

        assert_eq!(dapp.branch().await, RenderBranch::StartPresale);
        assert_eq!(dapp.snapshot().await.phase, PresalePhase::NotStarted);
    }

    #[tokio::test]
    async fn stranger_before_presale_only_sees_text() {
        let wallet = wallet(STRANGER, false);
        let dapp = dapp(&wallet);

        assert!(dapp.connect_wallet().await);
        dapp.check_presale_started().await;

        assert_eq!(dapp.branch().await, RenderBranch::PresaleNotStarted);
        assert!(!dapp.snapshot().await.is_owner);
    }

    #[tokio::test]
    async fn owner_check_only_runs_while_presale_not_started() {
        let wallet = wallet(ACCOUNT, true);
        let dapp = dapp(&wallet);

        dapp.check_presale_started().await;
        assert_eq!(wallet.call_count(selector(abi::OWNER)), 0);
    }

    #[tokio::test]
    async fn running_presale_offers_presale_mint() {
        let wallet = wallet(STRANGER, true);
        let dapp = dapp(&wallet);

        dapp.connect_wallet().await;
        dapp.check_presale_started().await;
        assert_eq!(dapp.check_presale_ended().await, Some(false));

        assert_eq!(dapp.branch().await, RenderBranch::PresaleMint);
    }

    #[tokio::test]
    async fn wrong_network_queues_one_notice_and_stays_disconnected() {
        let wallet = wallet(ACCOUNT, false);
        wallet.set_chain_id(1);
        let dapp = dapp(&wallet);

        assert!(!dapp.connect_wallet().await);
        assert_eq!(dapp.check_presale_started().await, None);

        let snapshot = dapp.take_snapshot().await;
        assert!(!snapshot.wallet_connected);
        assert_eq!(snapshot.notices.len(), 1);
        assert_eq!(snapshot.notices[0].kind, NoticeKind::WrongNetwork);
        assert_eq!(snapshot.notices[0].message, "Change the network to Rinkeby");
        assert_eq!(wallet.count("eth_call"), 0);

        assert!(dapp.take_snapshot().await.notices.is_empty());
    }

    #[tokio::test]
    async fn failed_read_keeps_previous_value() {
        let wallet = wallet(STRANGER, false);
        let dapp = dapp(&wallet);

        assert_eq!(dapp.refresh_minted_count().await, Some(3));
        wallet.fail_call(selector(abi::TOKEN_IDS), "node down");
        assert_eq!(dapp.refresh_minted_count().await, None);

        let snapshot = dapp.snapshot().await;
        assert_eq!(snapshot.minted.token_ids_minted, 3);
        assert!(snapshot.notices.is_empty());
    }

    #[tokio::test]
    async fn failed_started_read_keeps_presale_started() {
        let wallet = wallet(STRANGER, true);
        let dapp = dapp(&wallet);

        assert_eq!(dapp.check_presale_started().await, Some(true));
        wallet.fail_call(selector(abi::PRESALE_STARTED), "node down");
        assert_eq!(dapp.check_presale_started().await, None);

        let snapshot = dapp.snapshot().await;
        assert!(snapshot.presale.started);
        assert_eq!(snapshot.phase, PresalePhase::Started);
    }

    #[tokio::test]
    async fn failed_end_time_read_keeps_presale_ended() {
        let wallet = wallet(STRANGER, true);
        wallet.set_call_result(selector(abi::PRESALE_ENDED), uint_word(U256::from(NOW - 1)));
        let dapp = dapp(&wallet);

        dapp.check_presale_started().await;
        assert_eq!(dapp.check_presale_ended().await, Some(true));
        wallet.fail_call(selector(abi::PRESALE_ENDED), "node down");
        assert_eq!(dapp.check_presale_ended().await, None);

        let snapshot = dapp.snapshot().await;
        assert!(snapshot.presale.ended);
        assert_eq!(snapshot.phase, PresalePhase::Ended);
    }

    #[tokio::test]
    async fn failed_owner_read_keeps_owner_flag() {
        let wallet = wallet(ACCOUNT, false);
        let dapp = dapp(&wallet);

        assert_eq!(dapp.check_owner().await, Some(true));
        wallet.fail_call(selector(abi::OWNER), "node down");
        assert_eq!(dapp.check_owner().await, None);

        let snapshot = dapp.snapshot().await;
        assert!(snapshot.is_owner);
        assert!(snapshot.notices.is_empty());
    }

    #[tokio::test]
    async fn mint_success_queues_notice_and_returns_to_idle() {
        let wallet = wallet(STRANGER, true);
        let dapp = dapp(&wallet);
        dapp.connect_wallet().await;

        assert!(dapp.presale_mint().await);

        let snapshot = dapp.take_snapshot().await;
        assert_eq!(snapshot.in_flight, InFlight::Idle);
        assert_eq!(snapshot.notices.len(), 1);
        assert_eq!(snapshot.notices[0].kind, NoticeKind::MintSuccess);
        assert_eq!(snapshot.notices[0].message, MINT_SUCCESS_MESSAGE);
    }

    #[tokio::test]
    async fn failed_submission_returns_to_idle_without_success() {
        let wallet = wallet(STRANGER, true);
        wallet.fail_sends(Some("insufficient funds"));
        let dapp = dapp(&wallet);
        dapp.connect_wallet().await;

        assert!(!dapp.public_sale_mint().await);

        let snapshot = dapp.take_snapshot().await;
        assert_eq!(snapshot.in_flight, InFlight::Idle);
        assert!(snapshot.notices.is_empty());
    }

    #[tokio::test]
    async fn reverted_mint_returns_to_idle_without_success() {
        let wallet = wallet(STRANGER, true);
        wallet.set_revert(true);
        let dapp = dapp(&wallet);
        dapp.connect_wallet().await;

        assert!(!dapp.presale_mint().await);
        let snapshot = dapp.take_snapshot().await;
        assert_eq!(snapshot.in_flight, InFlight::Idle);
        assert!(snapshot.notices.is_empty());
    }

    #[tokio::test]
    async fn second_action_while_busy_is_rejected() {
        let wallet = wallet(STRANGER, true);
        let dapp = dapp(&wallet);
        dapp.connect_wallet().await;

        dapp.state().write().await.in_flight = InFlight::StartingPresale;
        assert!(!dapp.public_sale_mint().await);

        assert_eq!(wallet.count("eth_sendTransaction"), 0);
        assert_eq!(dapp.snapshot().await.in_flight, InFlight::StartingPresale);
        assert_eq!(dapp.branch().await, RenderBranch::Loading);
    }

    #[tokio::test]
    async fn starting_presale_rechecks_status() {
        let wallet = wallet(ACCOUNT, false);
        wallet.on_confirm(
            selector(abi::START_PRESALE),
            selector(abi::PRESALE_STARTED),
            bool_word(true),
        );
        let dapp = dapp(&wallet);
        dapp.connect_wallet().await;
        dapp.check_presale_started().await;
        assert_eq!(dapp.branch().await, RenderBranch::StartPresale);

        assert!(dapp.start_presale().await);

        let snapshot = dapp.snapshot().await;
        assert!(snapshot.presale.started);
        assert_eq!(snapshot.branch, RenderBranch::PresaleMint);
        assert!(snapshot.notices.is_empty());
    }
}
