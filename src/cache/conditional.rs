//! Conditional response interceptor.
//!
//! [`ConditionalCache`] sits in front of a route handler. Once the handler has
//! produced its response it attaches `Cache-Control` and `ETag`, and answers
//! `304 Not Modified` with an empty body when the client's `If-None-Match`
//! already names the body's fingerprint.

use std::{future::Future, pin::Pin, sync::Arc};

use tracing::debug;

use super::{FreshnessPolicy, fingerprint_bytes};
use crate::{
    Response,
    context::Context,
    http::headers::names,
    middleware::{Middleware, MiddlewareHandler, Next, from_middleware},
};

/// Route-level middleware applying a [`FreshnessPolicy`] and ETag validation.
///
/// # Examples
///
/// ```rust,no_run
/// use ledger_gateway::{Response, StatusCode, Router};
/// use ledger_gateway::cache::ConditionalCache;
///
/// let mut router = Router::new();
/// router.get_with(
///     "/api/getUserData",
///     vec![ConditionalCache::user_data().into_handler()],
///     |_ctx| async { Response::new(StatusCode::Ok).body("{}") },
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalCache {
    policy: FreshnessPolicy,
}

impl ConditionalCache {
    pub fn new(policy: FreshnessPolicy) -> Self {
        Self { policy }
    }

    /// Five-minute freshness for canister user data.
    pub fn user_data() -> Self {
        Self::new(FreshnessPolicy::VOLATILE)
    }

    /// One-hour freshness for token metadata.
    pub fn token_metadata() -> Self {
        Self::new(FreshnessPolicy::STATIC)
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Boxes this interceptor for a router middleware list.
    pub fn into_handler(self) -> MiddlewareHandler {
        from_middleware(Arc::new(self))
    }
}

impl Middleware for ConditionalCache {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let policy = self.policy;

        Box::pin(async move {
            let client_token = ctx.if_none_match().map(str::to_owned);
            let response = next.run(ctx).await;
            decorate(policy, client_token.as_deref(), response)
        })
    }
}

/// Applies the caching decision to a handler's response.
///
/// - `Cache-Control` is always set.
/// - An empty body gets no `ETag`; a non-empty one gets `ETag: "<fingerprint>"`.
/// - A 2xx response whose `client_token` equals that quoted value exactly
///   becomes a bodiless `304`. Other statuses keep their status and body.
pub fn decorate(
    policy: FreshnessPolicy,
    client_token: Option<&str>,
    mut response: Response,
) -> Response {
    response.set_header(names::CACHE_CONTROL, policy.cache_control());

    if response.body_ref().is_empty() {
        return response;
    }

    let etag = format!("\"{}\"", fingerprint_bytes(response.body_ref()));
    let matched = client_token == Some(etag.as_str());
    response.set_header(names::ETAG, etag);

    if matched && response.status().is_success() {
        debug!("client copy is current, answering 304");
        return response.into_not_modified();
    }

    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{Request, StatusCode, router::Handler};

    fn ctx(if_none_match: Option<&str>) -> Context {
        let raw = match if_none_match {
            Some(token) => format!("GET /api/data HTTP/1.1\r\nIf-None-Match: {token}\r\n\r\n"),
            None => "GET /api/data HTTP/1.1\r\n\r\n".to_owned(),
        };
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        Context::new(req)
    }

    fn json_endpoint(body: serde_json::Value) -> Handler {
        Arc::new(
            move |_ctx: Context| -> Pin<Box<dyn Future<Output = Response> + Send>> {
                let body = body.clone();
                Box::pin(async move { Response::json(StatusCode::Ok, &body) })
            },
        )
    }

    fn status_endpoint(status: StatusCode, body: &'static str) -> Handler {
        Arc::new(
            move |_ctx: Context| -> Pin<Box<dyn Future<Output = Response> + Send>> {
                Box::pin(async move { Response::new(status).body(body) })
            },
        )
    }

    async fn run(cache: ConditionalCache, ctx: Context, endpoint: Handler) -> Response {
        Next::new(vec![cache.into_handler()], endpoint).run(ctx).await
    }

    fn quoted(fp: String) -> String {
        format!("\"{fp}\"")
    }

    #[tokio::test]
    async fn first_request_gets_etag_and_full_body() {
        let body = json!({ "name": "Test", "value": 123 });
        let res = run(ConditionalCache::default(), ctx(None), json_endpoint(body)).await;

        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.body_ref(), br#"{"name":"Test","value":123}"#);
        assert_eq!(
            res.headers().get("etag"),
            Some(quoted(fingerprint_bytes(br#"{"name":"Test","value":123}"#)).as_str())
        );
        assert_eq!(res.headers().get("cache-control"), Some("public, max-age=60"));
    }

    #[tokio::test]
    async fn matching_token_yields_empty_304() {
        let body = json!({ "name": "Test", "value": 123 });
        let first = run(ConditionalCache::user_data(), ctx(None), json_endpoint(body.clone())).await;
        let etag = first.headers().get("etag").unwrap().to_owned();

        let res = run(ConditionalCache::user_data(), ctx(Some(&etag)), json_endpoint(body)).await;

        assert_eq!(res.status(), StatusCode::NotModified);
        assert!(res.body_ref().is_empty());
        assert_eq!(res.headers().get("cache-control"), Some("public, max-age=300"));
        assert_eq!(res.headers().get("etag"), Some(etag.as_str()));
        assert!(!res.headers().contains("content-type"));
    }

    #[tokio::test]
    async fn different_bodies_get_different_etags() {
        let a = run(
            ConditionalCache::default(),
            ctx(None),
            json_endpoint(json!({ "name": "Test", "value": 123 })),
        )
        .await;
        let b = run(
            ConditionalCache::default(),
            ctx(None),
            json_endpoint(json!({ "name": "Test", "value": 456 })),
        )
        .await;
        assert_ne!(a.headers().get("etag"), b.headers().get("etag"));
    }

    #[tokio::test]
    async fn stale_token_forwards_new_body() {
        let body = json!({ "name": "Test", "value": 456 });
        let stale = quoted(fingerprint_bytes(br#"{"name":"Test","value":123}"#));
        let res = run(ConditionalCache::default(), ctx(Some(&stale)), json_endpoint(body)).await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert!(!res.body_ref().is_empty());
    }

    #[tokio::test]
    async fn malformed_tokens_never_match() {
        let wire = br#"{"test":"data"}"#;
        let bare = fingerprint_bytes(wire);
        let tokens = [
            bare.clone(),
            format!("W/\"{bare}\""),
            format!("\"{bare}\", \"other\""),
            "*".to_owned(),
            "garbage".to_owned(),
        ];

        for token in tokens {
            let res = run(
                ConditionalCache::default(),
                ctx(Some(&token)),
                json_endpoint(json!({ "test": "data" })),
            )
            .await;
            assert_eq!(res.status(), StatusCode::Ok, "token {token:?} must not match");
        }
    }

    #[tokio::test]
    async fn empty_body_gets_cache_control_only() {
        let res = run(
            ConditionalCache::default(),
            ctx(None),
            status_endpoint(StatusCode::NoContent, ""),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NoContent);
        assert_eq!(res.headers().get("cache-control"), Some("public, max-age=60"));
        assert!(!res.headers().contains("etag"));
    }

    #[tokio::test]
    async fn cache_control_is_independent_of_body() {
        for body in [json!({}), json!([1, 2, 3]), json!("text"), json!(42)] {
            let res = run(ConditionalCache::token_metadata(), ctx(None), json_endpoint(body)).await;
            assert_eq!(res.headers().get("cache-control"), Some("public, max-age=3600"));
        }
    }

    #[tokio::test]
    async fn failure_responses_keep_status_and_body_but_get_headers() {
        let body = r#"{"error":"Failed to fetch user data"}"#;
        let token = quoted(fingerprint_bytes(body.as_bytes()));
        let res = run(
            ConditionalCache::default(),
            ctx(Some(&token)),
            status_endpoint(StatusCode::InternalServerError, body),
        )
        .await;

        assert_eq!(res.status(), StatusCode::InternalServerError);
        assert_eq!(res.body_ref(), body.as_bytes());
        assert_eq!(res.headers().get("cache-control"), Some("public, max-age=60"));
        assert_eq!(res.headers().get("etag"), Some(token.as_str()));
    }

    #[test]
    fn bad_request_gets_cache_control_and_etag() {
        let body = r#"{"error":"Principal ID is required"}"#;
        let res = decorate(
            FreshnessPolicy::from_secs(300),
            None,
            Response::new(StatusCode::BadRequest).body(body),
        );

        assert_eq!(res.status(), StatusCode::BadRequest);
        assert_eq!(res.headers().get("cache-control"), Some("public, max-age=300"));
        assert_eq!(
            res.headers().get("etag"),
            Some(quoted(fingerprint_bytes(body.as_bytes())).as_str())
        );
    }

    #[tokio::test]
    async fn waits_for_slow_handlers() {
        let endpoint: Handler = Arc::new(
            |_ctx: Context| -> Pin<Box<dyn Future<Output = Response> + Send>> {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Response::json(StatusCode::Ok, &json!({ "slow": true }))
                })
            },
        );
        let res = run(ConditionalCache::default(), ctx(None), endpoint).await;
        assert!(res.headers().contains("etag"));
    }

    #[tokio::test]
    async fn concurrent_requests_are_independent() {
        let mut tasks = Vec::new();
        for i in 0..32u32 {
            tasks.push(tokio::spawn(async move {
                let body = json!({ "i": i });
                let expected = quoted(fingerprint_bytes(&serde_json::to_vec(&body).unwrap()));
                let token = (i % 2 == 0).then(|| expected.clone());
                let res = run(ConditionalCache::default(), ctx(token.as_deref()), json_endpoint(body)).await;
                (i, res.status(), res.headers().get("etag").map(str::to_owned), expected)
            }));
        }

        for task in tasks {
            let (i, status, etag, expected) = task.await.unwrap();
            assert_eq!(etag.as_deref(), Some(expected.as_str()));
            let want = if i % 2 == 0 { StatusCode::NotModified } else { StatusCode::Ok };
            assert_eq!(status, want);
        }
    }

    #[test]
    fn decorate_is_pure() {
        let make = || Response::new(StatusCode::Ok).body("same");
        let a = decorate(FreshnessPolicy::DEFAULT, None, make());
        let b = decorate(FreshnessPolicy::DEFAULT, None, make());
        assert_eq!(a.headers().get("etag"), b.headers().get("etag"));
        assert_eq!(
            a.headers().get("etag"),
            Some(quoted(fingerprint_bytes(b"same")).as_str())
        );
    }
}
