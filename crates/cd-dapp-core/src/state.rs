//! Page state shared by the controller, the pollers and the HTTP layer.
//!
//! One `DappState` per service, behind a `tokio::sync::RwLock`. Writers
//! take the lock only to apply a result they already awaited; no guard is
//! held across a wallet or chain call.

use alloy_primitives::Address;
use cd_api_types::{
    DappStateResponse, InFlight, MintCounter, Notice, PresalePhase, PresaleStatus, RenderBranch,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::presale::derive_phase;
use crate::view::{ViewFlags, render_branch};

pub type SharedState = Arc<RwLock<DappState>>;

#[derive(Clone, Debug, Default)]
pub struct Session {
    pub wallet_connected: bool,
    pub is_owner: bool,
    pub account: Option<Address>,
}

#[derive(Clone, Debug, Default)]
pub struct DappState {
    pub session: Session,
    pub presale: PresaleStatus,
    pub phase: PresalePhase,
    pub minted: MintCounter,
    pub in_flight: InFlight,
    notices: VecDeque<Notice>,
}

impl DappState {
    pub fn shared() -> SharedState {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn view_flags(&self) -> ViewFlags {
        ViewFlags {
            wallet_connected: self.session.wallet_connected,
            loading: self.in_flight.is_busy(),
            is_owner: self.session.is_owner,
            presale_started: self.presale.started,
            presale_ended: self.presale.ended,
        }
    }

    pub fn branch(&self) -> RenderBranch {
        render_branch(&self.view_flags())
    }

    pub fn set_presale_started(&mut self, started: bool) {
        self.presale.started = started;
        self.phase = derive_phase(self.presale);
    }

    pub fn set_presale_ended(&mut self, ended: bool) {
        self.presale.ended = ended;
        self.phase = derive_phase(self.presale);
    }

    /// Queues a notice unless an identical one is still waiting to be shown.
    pub fn push_notice(&mut self, notice: Notice) {
        if !self.notices.contains(&notice) {
            self.notices.push_back(notice);
        }
    }

    pub fn pending_notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn to_response(&self, notices: Vec<Notice>) -> DappStateResponse {
        DappStateResponse {
            wallet_connected: self.session.wallet_connected,
            is_owner: self.session.is_owner,
            account: self.session.account.map(|account| account.to_string()),
            in_flight: self.in_flight,
            phase: self.phase,
            presale: self.presale,
            minted: self.minted,
            branch: self.branch(),
            notices,
        }
    }
}
