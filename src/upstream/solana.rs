//! Solana token metadata via the Metaplex Digital Asset Standard RPC.
//!
//! `getAsset` returns the on-chain name and symbol together with the URI of the
//! off-chain JSON document, which is fetched as a second step.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use super::{TokenMetadataSource, UpstreamError};
use crate::BoxFuture;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Asset>,
    error: Option<RpcFailure>,
}

#[derive(Debug, Deserialize)]
struct RpcFailure {
    code: i64,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub content: AssetContent,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetContent {
    #[serde(default)]
    pub json_uri: String,
    #[serde(default)]
    pub metadata: AssetMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

/// What `/api/getMemecoinPrice` returns for a mint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub token_address: String,
    /// Off-chain JSON document, `null` when the URI is empty or unreachable.
    pub metadata: Value,
}

impl TokenMetadata {
    pub fn from_asset(mint: &str, asset: Asset, metadata: Value) -> Self {
        let AssetContent { json_uri, metadata: on_chain } = asset.content;
        Self {
            name: on_chain.name.trim_end_matches('\0').to_owned(),
            symbol: on_chain.symbol.trim_end_matches('\0').to_owned(),
            uri: json_uri.trim_end_matches('\0').to_owned(),
            token_address: mint.to_owned(),
            metadata,
        }
    }
}

/// JSON-RPC client for a DAS-capable Solana endpoint.
pub struct TokenMetadataClient {
    http: reqwest::Client,
    rpc_url: Option<String>,
}

impl TokenMetadataClient {
    /// `rpc_url` may be absent; lookups then fail with a configuration error.
    pub fn new(rpc_url: Option<String>) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, rpc_url })
    }

    pub async fn get_token_metadata(&self, mint: &str) -> Result<TokenMetadata, UpstreamError> {
        let rpc_url = self
            .rpc_url
            .as_deref()
            .ok_or(UpstreamError::NotConfigured("Solana RPC URL not configured"))?;

        let request = json!({
            "jsonrpc": "2.0",
            "id": "ledger-gateway",
            "method": "getAsset",
            "params": { "id": mint },
        });

        let response = self.http.post(rpc_url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
            });
        }

        let envelope: RpcEnvelope = response.json().await?;
        let asset = match envelope {
            RpcEnvelope {
                error: Some(RpcFailure { code, message }),
                ..
            } => return Err(UpstreamError::Rpc { code, message }),
            RpcEnvelope {
                result: Some(asset),
                ..
            } => asset,
            RpcEnvelope { result: None, .. } => {
                return Err(UpstreamError::Decode(format!("no asset found for mint {mint}")));
            }
        };

        let uri = asset.content.json_uri.trim_end_matches('\0').to_owned();
        let metadata = if uri.is_empty() {
            Value::Null
        } else {
            self.fetch_document(&uri).await.unwrap_or_else(|e| {
                warn!(%uri, error = %e, "off-chain token metadata unavailable");
                Value::Null
            })
        };

        Ok(TokenMetadata::from_asset(mint, asset, metadata))
    }

    async fn fetch_document(&self, uri: &str) -> Result<Value, UpstreamError> {
        let response = self.http.get(uri).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

impl TokenMetadataSource for TokenMetadataClient {
    fn token_metadata<'a>(&'a self, mint: &'a str) -> BoxFuture<'a, Result<Value, UpstreamError>> {
        Box::pin(async move {
            let token = self.get_token_metadata(mint).await?;
            serde_json::to_value(token).map_err(|e| UpstreamError::Decode(e.to_string()))
        })
    }
}
