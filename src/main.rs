use std::sync::Arc;

use ledger_gateway::{
    Server,
    api::{self, AppState},
    config::Config,
    database::SqliteAuditLog,
    upstream::{CanisterClient, TokenMetadataClient},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG overrides; defaults to info.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    info!(
        environment = %config.environment,
        icp_host = %config.icp_host,
        canister = %config.icp_canister_id,
        solana_rpc = config.solana_rpc_url.is_some(),
        "configuration loaded"
    );
    if config.solana_rpc_url.is_none() {
        warn!("SOLANA_RPC_URL is not set, token metadata lookups will fail");
    }

    let audit = SqliteAuditLog::open(&config.database_path)?;
    let canister = CanisterClient::connect(&config).await?;
    let tokens = TokenMetadataClient::new(config.solana_rpc_url.clone())?;

    let addr = config.bind_addr();
    let state = Arc::new(AppState {
        config,
        user_data: Arc::new(canister),
        tokens: Arc::new(tokens),
        audit: Arc::new(audit),
    });

    let server = Server::bind(&addr).await?;
    server
        .run_until(api::router(state), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "unable to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("server stopped");
    Ok(())
}
