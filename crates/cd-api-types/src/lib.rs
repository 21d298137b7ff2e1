use serde::{Deserialize, Serialize};

/// Number of Crypto Devs the contract will ever mint.
pub const MINT_CAP: u64 = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainId(pub u64);

/// Which user action is currently waiting on the wallet or the chain.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InFlight {
    #[default]
    Idle,
    Connecting,
    Minting,
    StartingPresale,
}

impl InFlight {
    pub fn is_busy(self) -> bool {
        self != InFlight::Idle
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresalePhase {
    #[default]
    Unknown,
    NotStarted,
    Started,
    Ended,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresaleStatus {
    pub started: bool,
    pub ended: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MintCounter {
    pub token_ids_minted: u64,
    pub cap: u64,
}

impl Default for MintCounter {
    fn default() -> Self {
        Self {
            token_ids_minted: 0,
            cap: MINT_CAP,
        }
    }
}

/// The single call-to-action the page shows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RenderBranch {
    ConnectWallet,
    Loading,
    StartPresale,
    PresaleNotStarted,
    PresaleMint,
    PublicMint,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    WrongNetwork,
    MintSuccess,
}

/// A blocking message for the user, shown once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DappStateResponse {
    pub wallet_connected: bool,
    pub is_owner: bool,
    pub account: Option<String>,
    pub in_flight: InFlight,
    pub phase: PresalePhase,
    pub presale: PresaleStatus,
    pub minted: MintCounter,
    pub branch: RenderBranch,
    pub notices: Vec<Notice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_response_uses_snake_case_tags() {
        let response = DappStateResponse {
            wallet_connected: true,
            is_owner: false,
            account: None,
            in_flight: InFlight::StartingPresale,
            phase: PresalePhase::NotStarted,
            presale: PresaleStatus::default(),
            minted: MintCounter::default(),
            branch: RenderBranch::PresaleNotStarted,
            notices: vec![Notice {
                kind: NoticeKind::WrongNetwork,
                message: "Change the network to Rinkeby".to_owned(),
            }],
        };

        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["in_flight"], "starting_presale");
        assert_eq!(value["phase"], "not_started");
        assert_eq!(value["branch"], "presale_not_started");
        assert_eq!(value["minted"]["cap"], 20);
        assert_eq!(value["notices"][0]["kind"], "wrong_network");
    }

    #[test]
    fn only_idle_is_not_busy() {
        assert!(!InFlight::Idle.is_busy());
        assert!(InFlight::Connecting.is_busy());
        assert!(InFlight::Minting.is_busy());
        assert!(InFlight::StartingPresale.is_busy());
    }
}
