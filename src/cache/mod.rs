//! HTTP conditional-response caching.
//!
//! Nothing here stores responses. Each request carries everything needed for
//! the decision: the handler's body is fingerprinted, advertised as an `ETag`
//! together with a `Cache-Control` freshness lifetime, and compared against the
//! client's `If-None-Match` token.
//!
//! - [`fingerprint`], [`fingerprint_value`], [`fingerprint_bytes`]: content digests.
//! - [`FreshnessPolicy`]: the advertised `max-age`.
//! - [`ConditionalCache`]: route middleware applying both.
//!
//! The interceptor hashes the body bytes exactly as emitted, through
//! [`fingerprint_bytes`]. [`fingerprint_value`] is the entry point for values
//! not yet serialized and writes object keys in sorted order, so it agrees with
//! the interceptor only when the emitted body is already canonical.

mod conditional;
mod fingerprint;
mod policy;

pub use conditional::{ConditionalCache, decorate};
pub use fingerprint::{canonical_json, fingerprint, fingerprint_bytes, fingerprint_value};
pub use policy::FreshnessPolicy;
