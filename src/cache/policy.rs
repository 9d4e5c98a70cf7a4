use std::time::Duration;

/// How long a client may reuse a response without revalidating it.
///
/// Fixed when a [`ConditionalCache`](super::ConditionalCache) is built and
/// never changed afterwards.
///
/// ```
/// use ledger_gateway::cache::FreshnessPolicy;
///
/// assert_eq!(FreshnessPolicy::from_secs(300).cache_control(), "public, max-age=300");
/// assert_eq!(FreshnessPolicy::default().max_age().as_secs(), 60);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    max_age: Duration,
}

impl FreshnessPolicy {
    /// Applied when no duration is given.
    pub const DEFAULT: Self = Self::from_secs(60);

    /// Canister user data: changes often.
    pub const VOLATILE: Self = Self::from_secs(300);

    /// Token metadata: rarely changes.
    pub const STATIC: Self = Self::from_secs(60 * 60);

    pub const fn from_secs(secs: u64) -> Self {
        Self {
            max_age: Duration::from_secs(secs),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// The `Cache-Control` value advertising this policy.
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.max_age.as_secs())
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}
