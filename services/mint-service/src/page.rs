//! Server-rendered Crypto Devs page.

use cd_api_types::{DappStateResponse, Notice, RenderBranch};
use std::time::Duration;

const STYLE: &str = r#"
body { margin: 0; font-family: "Courier New", Courier, monospace; }
.main { min-height: 90vh; display: flex; flex-direction: row; justify-content: center; align-items: center; }
.title { font-size: 2rem; margin: 2rem 0; }
.description { line-height: 1; margin: 2rem 0; font-size: 1.2rem; }
.button { border-radius: 4px; background-color: blue; border: none; color: #ffffff; font-size: 15px; padding: 20px; width: 200px; cursor: pointer; margin-bottom: 2%; }
.image { width: 70%; height: 50%; margin-left: 20%; }
.footer { display: flex; padding: 2rem 0; border-top: 1px solid #eaeaea; justify-content: center; align-items: center; }
dialog.notice { border: 2px solid blue; border-radius: 4px; padding: 1.5rem; }
"#;

pub(crate) fn render(snapshot: &DappStateResponse, refresh_every: Duration) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh}">
<meta name="description" content="Whitelist-Dapp">
<title>Crypto Devs</title>
<style>{STYLE}</style>
</head>
<body>
"#,
        refresh = refresh_every.as_secs().max(1),
    ));

    for notice in &snapshot.notices {
        html.push_str(&render_notice(notice));
    }

    html.push_str(&format!(
        r#"<div class="main">
<div>
<h1 class="title">Welcome to Crypto Devs!</h1>
<div class="description">Its an NFT collection for developers in Crypto.</div>
<div class="description">{minted}/{cap} have been minted</div>
{action}
</div>
<div><img class="image" src="/cryptodevs/0.svg" alt="Crypto Dev"></div>
</div>
<footer class="footer">Made with &#10084; by Crypto Devs</footer>
</body>
</html>
"#,
        minted = snapshot.minted.token_ids_minted,
        cap = snapshot.minted.cap,
        action = render_action(snapshot.branch),
    ));
    html
}

fn render_notice(notice: &Notice) -> String {
    format!(
        r#"<dialog class="notice" open role="alertdialog"><p>{}</p><form method="dialog"><button class="button">OK</button></form></dialog>
"#,
        escape(&notice.message)
    )
}

fn action_form(path: &str, label: &str) -> String {
    format!(
        r#"<form method="post" action="{path}"><button class="button" type="submit">{label}</button></form>"#
    )
}

pub(crate) fn render_action(branch: RenderBranch) -> String {
    match branch {
        RenderBranch::ConnectWallet => action_form("/wallet/connect", "Connect your wallet"),
        RenderBranch::Loading => r#"<button class="button" disabled>Loading...</button>"#.to_owned(),
        RenderBranch::StartPresale => action_form("/presale/start", "Start Presale!"),
        RenderBranch::PresaleNotStarted => {
            r#"<div><div class="description">Presale hasnt started!</div></div>"#.to_owned()
        }
        RenderBranch::PresaleMint => format!(
            r#"<div><div class="description">Presale has started!!! If your address is whitelisted, Mint a Crypto Dev &#x1F973;</div>{}</div>"#,
            action_form("/presale/mint", "Presale Mint &#x1F680;")
        ),
        RenderBranch::PublicMint => action_form("/mint", "Public Mint &#x1F680;"),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cd_api_types::{
        InFlight, MintCounter, NoticeKind, PresalePhase, PresaleStatus,
    };

    fn snapshot(branch: RenderBranch, notices: Vec<Notice>) -> DappStateResponse {
        DappStateResponse {
            wallet_connected: true,
            is_owner: false,
            account: None,
            in_flight: InFlight::Idle,
            phase: PresalePhase::Started,
            presale: PresaleStatus {
                started: true,
                ended: false,
            },
            minted: MintCounter {
                token_ids_minted: 7,
                cap: 20,
            },
            branch,
            notices,
        }
    }

    #[test]
    fn page_shows_counter_and_refreshes_on_poll_interval() {
        let html = render(&snapshot(RenderBranch::PresaleMint, Vec::new()), Duration::from_secs(5));
        assert!(html.contains("7/20 have been minted"));
        assert!(html.contains(r#"content="5""#));
        assert!(html.contains("/cryptodevs/0.svg"));
        assert!(html.contains(r#"action="/presale/mint""#));
    }

    #[test]
    fn each_branch_has_its_call_to_action() {
        let cases = [
            (RenderBranch::ConnectWallet, "Connect your wallet"),
            (RenderBranch::Loading, "Loading..."),
            (RenderBranch::StartPresale, "Start Presale!"),
            (RenderBranch::PresaleNotStarted, "Presale hasnt started!"),
            (RenderBranch::PresaleMint, "Presale Mint"),
            (RenderBranch::PublicMint, "Public Mint"),
        ];
        for (branch, text) in cases {
            assert!(render_action(branch).contains(text), "{branch:?}");
        }
        assert!(!render_action(RenderBranch::Loading).contains("<form"));
        assert!(!render_action(RenderBranch::PresaleNotStarted).contains("<form"));
    }

    #[test]
    fn notices_are_escaped_dialogs() {
        let notice = Notice {
            kind: NoticeKind::MintSuccess,
            message: "<b>minted</b>".to_owned(),
        };
        let html = render(&snapshot(RenderBranch::PublicMint, vec![notice]), Duration::from_secs(5));
        assert!(html.contains("&lt;b&gt;minted&lt;/b&gt;"));
        assert!(html.contains("<dialog"));
    }
}
