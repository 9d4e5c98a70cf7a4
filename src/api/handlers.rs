use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::{AppState, error::ApiError};
use crate::{
    Response, StatusCode,
    context::Context,
    validation::{is_valid_principal, is_valid_solana_address},
};

const CONFIGURED: &str = "***configured***";
const NOT_CONFIGURED: &str = "not configured";

/// `GET /health`
pub async fn health(_ctx: Context) -> Response {
    Response::json(StatusCode::Ok, &json!({ "status": "OK" }))
}

/// `GET /api/getUserData?principal=<principal>`
pub async fn get_user_data(state: Arc<AppState>, ctx: Context) -> Response {
    match user_data(&state, &ctx).await {
        Ok(body) => body,
        Err(e) => e.into_response(),
    }
}

async fn user_data(state: &AppState, ctx: &Context) -> Result<Response, ApiError> {
    let principal = ctx
        .query("principal")
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::BadRequest("Principal ID is required"))?;

    if !is_valid_principal(principal) {
        return Err(ApiError::BadRequest("Invalid Principal ID format"));
    }

    if let Err(e) = state.audit.record_principal(principal).await {
        warn!(%principal, error = %e, "failed to record lookup in audit log");
    }

    info!(%principal, "fetching user data");
    let data = state
        .user_data
        .user_data(principal)
        .await
        .map_err(|source| ApiError::Upstream {
            context: "Failed to fetch user data",
            source,
        })?;

    Ok(Response::json(StatusCode::Ok, &data))
}

/// `GET /api/getMemecoinPrice?contract=<mint>`
pub async fn get_token_metadata(state: Arc<AppState>, ctx: Context) -> Response {
    match token_metadata(&state, &ctx).await {
        Ok(body) => body,
        Err(e) => e.into_response(),
    }
}

async fn token_metadata(state: &AppState, ctx: &Context) -> Result<Response, ApiError> {
    let contract = ctx
        .query("contract")
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::BadRequest("Token contract address is required"))?;

    if !is_valid_solana_address(contract) {
        return Err(ApiError::BadRequest("Invalid Solana token address format"));
    }

    info!(%contract, "fetching token metadata");
    let data = state
        .tokens
        .token_metadata(contract)
        .await
        .map_err(|source| ApiError::Upstream {
            context: "Failed to fetch token metadata",
            source,
        })?;

    Ok(Response::json(StatusCode::Ok, &data))
}

/// `GET /api/debug`, registered outside production only. Secrets are masked.
pub async fn debug(state: Arc<AppState>, _ctx: Context) -> Response {
    let config = &state.config;
    let masked = |set: bool| if set { CONFIGURED } else { NOT_CONFIGURED };

    Response::json(
        StatusCode::Ok,
        &json!({
            "env": {
                "APP_ENV": config.environment.as_str(),
                "PORT": config.port,
                "ICP_HOST": config.icp_host,
                "ICP_CANISTER_ID": config.icp_canister_id,
                "SOLANA_RPC_URL": masked(config.solana_rpc_url.is_some()),
                "DATABASE_PATH": masked(!config.database_path.is_empty()),
            }
        }),
    )
}
