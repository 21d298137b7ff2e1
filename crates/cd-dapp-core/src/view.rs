use cd_api_types::RenderBranch;

/// The flags the page decides its call-to-action from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewFlags {
    pub wallet_connected: bool,
    pub loading: bool,
    pub is_owner: bool,
    pub presale_started: bool,
    pub presale_ended: bool,
}

/// First matching rule wins; the order is the contract.
pub fn render_branch(flags: &ViewFlags) -> RenderBranch {
    if !flags.wallet_connected {
        return RenderBranch::ConnectWallet;
    }
    if flags.loading {
        return RenderBranch::Loading;
    }
    if flags.is_owner && !flags.presale_started {
        return RenderBranch::StartPresale;
    }
    if !flags.presale_started {
        return RenderBranch::PresaleNotStarted;
    }
    if !flags.presale_ended {
        return RenderBranch::PresaleMint;
    }
    RenderBranch::PublicMint
}
