//! Upstream data providers.
//!
//! Each provider is one async lookup keyed by a validated identifier, returning
//! a JSON document or an [`UpstreamError`] whose message is safe to show
//! clients. Handlers only see the traits, so tests swap in stubs.

use serde_json::Value;
use thiserror::Error;

use crate::BoxFuture;

pub mod icp;
pub mod normalize;
pub mod solana;

pub use icp::CanisterClient;
pub use solana::TokenMetadataClient;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("canister call failed: {0}")]
    Canister(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Per-user referral data held by the canister.
pub trait UserDataSource: Send + Sync {
    fn user_data<'a>(&'a self, principal: &'a str) -> BoxFuture<'a, Result<Value, UpstreamError>>;
}

/// Token name, symbol and off-chain metadata for a mint address.
pub trait TokenMetadataSource: Send + Sync {
    fn token_metadata<'a>(&'a self, mint: &'a str) -> BoxFuture<'a, Result<Value, UpstreamError>>;
}
