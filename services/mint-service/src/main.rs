mod config;
mod page;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, Redirect},
    routing::{get, post},
};
use cd_api_types::DappStateResponse;
use cd_chain_client::{RINKEBY, WalletConnector, WalletProvider};
use cd_chain_rpc::HttpWalletProvider;
use cd_dapp_core::{Dapp, SystemClock, mount};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::ServiceConfig;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ActionResult = Result<Redirect, (StatusCode, Json<ErrorResponse>)>;

#[derive(Clone)]
pub(crate) struct AppState {
    dapp: Arc<Dapp>,
    poll_interval: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServiceConfig::from_env()?;

    let wallet = config.wallet_url.clone().map(|url| {
        info!("using wallet at {}", url);
        Arc::new(HttpWalletProvider::new(Some(url))) as Arc<dyn WalletProvider>
    });
    if wallet.is_none() {
        warn!("no wallet configured; every chain operation will fail until one is");
    }

    let connector = Arc::new(WalletConnector::new(wallet, RINKEBY));
    let dapp = Arc::new(Dapp::new(
        connector,
        config.contract_address,
        config.confirm_interval,
        Arc::new(SystemClock),
    ));

    let pollers = mount(Arc::clone(&dapp), config.poll_interval).await;

    let state = AppState {
        dapp,
        poll_interval: config.poll_interval,
    };
    let app = router(state, &config.asset_dir);

    info!(
        "mint-service listening on {} for contract {}",
        config.listen_addr, config.contract_address
    );
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pollers.shutdown().await;
    Ok(())
}

pub(crate) fn router(state: AppState, asset_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/state", get(dapp_state))
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/wallet/connect", post(connect_wallet))
        .route("/presale/start", post(start_presale))
        .route("/presale/mint", post(presale_mint))
        .route("/mint", post(public_mint))
        .nest_service("/cryptodevs", ServeDir::new(asset_dir.join("cryptodevs")))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "mint-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "mint-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Renders the page and hands it any queued notices, so each shows once.
async fn index(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.dapp.take_snapshot().await;
    Html(page::render(&snapshot, state.poll_interval))
}

async fn dapp_state(State(state): State<AppState>) -> Json<DappStateResponse> {
    Json(state.dapp.snapshot().await)
}

// Actions spend the wallet's funds, so only the page itself may post them.
// Browsers send `Origin` on every form POST; a request without one did not
// come from another site's page.
fn require_same_origin(
    headers: &HeaderMap,
    action: &str,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return Ok(());
    };
    let origin_host = origin
        .to_str()
        .ok()
        .and_then(|origin| origin.split_once("://"))
        .map(|(_, authority)| authority.trim_end_matches('/'));
    let host = headers.get(header::HOST).and_then(|value| value.to_str().ok());

    match (origin_host, host) {
        (Some(origin_host), Some(host)) if origin_host.eq_ignore_ascii_case(host) => Ok(()),
        _ => {
            warn!("{action}: refused cross-origin request from {:?}", origin);
            Err((
                StatusCode::FORBIDDEN,
                Json(ErrorResponse {
                    error: "cross-origin actions are not allowed".to_owned(),
                }),
            ))
        }
    }
}

// Actions run detached so the page can show `Loading...` while the wallet
// and the chain work; the outcome lands in state and notices.

async fn connect_wallet(State(state): State<AppState>, headers: HeaderMap) -> ActionResult {
    require_same_origin(&headers, "connect_wallet")?;
    let dapp = Arc::clone(&state.dapp);
    tokio::spawn(async move {
        dapp.connect_wallet().await;
    });
    Ok(Redirect::to("/"))
}

async fn start_presale(State(state): State<AppState>, headers: HeaderMap) -> ActionResult {
    require_same_origin(&headers, "start_presale")?;
    let dapp = Arc::clone(&state.dapp);
    tokio::spawn(async move {
        dapp.start_presale().await;
    });
    Ok(Redirect::to("/"))
}

async fn presale_mint(State(state): State<AppState>, headers: HeaderMap) -> ActionResult {
    require_same_origin(&headers, "presale_mint")?;
    let dapp = Arc::clone(&state.dapp);
    tokio::spawn(async move {
        dapp.presale_mint().await;
    });
    Ok(Redirect::to("/"))
}

async fn public_mint(State(state): State<AppState>, headers: HeaderMap) -> ActionResult {
    require_same_origin(&headers, "public_sale_mint")?;
    let dapp = Arc::clone(&state.dapp);
    tokio::spawn(async move {
        dapp.public_sale_mint().await;
    });
    Ok(Redirect::to("/"))
}
