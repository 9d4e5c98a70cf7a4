//! Internet Computer canister client for per-user referral data.

use candid::{CandidType, Deserialize, Nat, Principal};
use ic_agent::Agent;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{UpstreamError, UserDataSource, normalize::natural};
use crate::{BoxFuture, config::Config};

const GET_USER_DATA: &str = "getUserData";

/// The canister's `getUserData` reply record.
#[derive(Debug, Clone, CandidType, Deserialize)]
pub struct UserData {
    #[serde(rename = "referralCode")]
    pub referral_code: String,
    #[serde(rename = "referrerCode")]
    pub referrer_code: String,
    #[serde(rename = "queueIdx")]
    pub queue_idx: Nat,
    pub rank: Vec<(String, Nat)>,
    #[serde(rename = "referralsLevel1")]
    pub referrals_level1: Nat,
    #[serde(rename = "referralsLevel2")]
    pub referrals_level2: Nat,
    #[serde(rename = "referralsLevel3")]
    pub referrals_level3: Nat,
    #[serde(rename = "referrerWallet")]
    pub referrer_wallet: String,
}

impl UserData {
    /// Client-facing JSON: camelCase keys, naturals normalized.
    pub fn to_json(&self) -> Value {
        let rank = self
            .rank
            .iter()
            .map(|(who, score)| Value::Array(vec![Value::from(who.as_str()), natural(score)]))
            .collect();

        let mut out = Map::new();
        out.insert("referralCode".into(), self.referral_code.clone().into());
        out.insert("referrerCode".into(), self.referrer_code.clone().into());
        out.insert("queueIdx".into(), natural(&self.queue_idx));
        out.insert("rank".into(), Value::Array(rank));
        out.insert("referralsLevel1".into(), natural(&self.referrals_level1));
        out.insert("referralsLevel2".into(), natural(&self.referrals_level2));
        out.insert("referralsLevel3".into(), natural(&self.referrals_level3));
        out.insert("referrerWallet".into(), self.referrer_wallet.clone().into());
        Value::Object(out)
    }
}

/// A connected agent bound to one canister.
///
/// Built once at startup and shared; the agent holds its own HTTP client.
pub struct CanisterClient {
    agent: Agent,
    canister_id: Principal,
}

impl CanisterClient {
    /// Builds the agent for `config.icp_host`.
    ///
    /// Against a local replica the root key is fetched first; failure there is
    /// logged and startup continues, since the replica may come up later.
    pub async fn connect(config: &Config) -> Result<Self, UpstreamError> {
        let canister_id = Principal::from_text(&config.icp_canister_id)
            .map_err(|e| UpstreamError::InvalidIdentifier(format!("canister id: {e}")))?;

        let agent = Agent::builder()
            .with_url(config.icp_host.as_str())
            .build()
            .map_err(|e| UpstreamError::Canister(e.to_string()))?;

        if config.icp_is_local() {
            if let Err(e) = agent.fetch_root_key().await {
                warn!(error = %e, "unable to fetch root key, is the local replica running?");
            }
        }

        debug!(host = %config.icp_host, canister = %canister_id, "canister client ready");
        Ok(Self { agent, canister_id })
    }

    pub async fn get_user_data(&self, principal: &str) -> Result<UserData, UpstreamError> {
        let principal = Principal::from_text(principal)
            .map_err(|e| UpstreamError::InvalidIdentifier(e.to_string()))?;
        let arg = candid::encode_one(principal.to_text())
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let reply = self
            .agent
            .update(&self.canister_id, GET_USER_DATA)
            .with_arg(arg)
            .call_and_wait()
            .await
            .map_err(|e| UpstreamError::Canister(e.to_string()))?;

        candid::decode_one(&reply).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

impl UserDataSource for CanisterClient {
    fn user_data<'a>(&'a self, principal: &'a str) -> BoxFuture<'a, Result<Value, UpstreamError>> {
        Box::pin(async move { Ok(self.get_user_data(principal).await?.to_json()) })
    }
}
