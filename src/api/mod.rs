//! REST surface of the gateway.
//!
//! [`router`] wires the handlers behind the global logging and CORS layers and
//! puts each data route behind a [`ConditionalCache`] sized for how often its
//! upstream data changes.

use std::sync::Arc;

use crate::{
    Router,
    cache::ConditionalCache,
    config::Config,
    database::AuditLog,
    middleware::{LoggerMiddleware, from_middleware},
    security::CorsMiddleware,
    upstream::{TokenMetadataSource, UserDataSource},
};

pub mod error;
pub mod handlers;

pub use error::ApiError;

/// Shared dependencies of every handler.
pub struct AppState {
    pub config: Config,
    pub user_data: Arc<dyn UserDataSource>,
    pub tokens: Arc<dyn TokenMetadataSource>,
    pub audit: Arc<dyn AuditLog>,
}

/// Builds the gateway's router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();
    router.layer(from_middleware(Arc::new(LoggerMiddleware)));
    router.layer(from_middleware(Arc::new(CorsMiddleware::permissive())));

    router.get("/health", handlers::health);

    let s = Arc::clone(&state);
    router.get_with(
        "/api/getUserData",
        vec![ConditionalCache::user_data().into_handler()],
        move |ctx| handlers::get_user_data(Arc::clone(&s), ctx),
    );

    let s = Arc::clone(&state);
    router.get_with(
        "/api/getMemecoinPrice",
        vec![ConditionalCache::token_metadata().into_handler()],
        move |ctx| handlers::get_token_metadata(Arc::clone(&s), ctx),
    );

    if !state.config.environment.is_production() {
        let s = Arc::clone(&state);
        router.get("/api/debug", move |ctx| handlers::debug(Arc::clone(&s), ctx));
    }

    router
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};

    use super::*;
    use crate::{
        BoxFuture, Request, Response, StatusCode,
        config::Environment,
        database::{AuditError, SqliteAuditLog},
        upstream::UpstreamError,
    };

    const PRINCIPAL: &str = "2vxsx-fae";
    const MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    #[derive(Default)]
    struct Users {
        calls: AtomicUsize,
    }

    impl UserDataSource for Users {
        fn user_data<'a>(
            &'a self,
            principal: &'a str,
        ) -> BoxFuture<'a, Result<Value, UpstreamError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(json!({ "referralCode": "PUPS1327478D55", "principal": principal }))
            })
        }
    }

    struct Tokens;

    impl TokenMetadataSource for Tokens {
        fn token_metadata<'a>(
            &'a self,
            _mint: &'a str,
        ) -> BoxFuture<'a, Result<Value, UpstreamError>> {
            Box::pin(async { Err(UpstreamError::NotConfigured("Solana RPC URL not configured")) })
        }
    }

    struct BrokenAudit;

    impl AuditLog for BrokenAudit {
        fn record_principal<'a>(
            &'a self,
            _principal: &'a str,
        ) -> BoxFuture<'a, Result<(), AuditError>> {
            Box::pin(async { Err(AuditError::Poisoned) })
        }
    }

    fn config(environment: Environment) -> Config {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.environment = environment;
        config
    }

    fn state(
        audit: Arc<dyn AuditLog>,
        users: Arc<Users>,
        environment: Environment,
    ) -> Arc<AppState> {
        Arc::new(AppState {
            config: config(environment),
            user_data: users,
            tokens: Arc::new(Tokens),
            audit,
        })
    }

    async fn get(router: &Router, target: &str, headers: &str) -> Response {
        let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n{headers}\r\n");
        let (request, _) = Request::parse(raw.as_bytes()).unwrap();
        router.dispatch(request).await
    }

    fn body_json(res: &Response) -> Value {
        serde_json::from_slice(res.body_ref()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let users = Arc::new(Users::default());
        let audit = Arc::new(SqliteAuditLog::open_in_memory().unwrap());
        let router = router(state(audit, users, Environment::Development));

        let res = get(&router, "/health", "").await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(body_json(&res), json!({ "status": "OK" }));
        assert!(res.headers().get("ETag").is_none());
    }

    #[tokio::test]
    async fn user_data_validation() {
        let users = Arc::new(Users::default());
        let audit = Arc::new(SqliteAuditLog::open_in_memory().unwrap());
        let router = router(state(audit, Arc::clone(&users), Environment::Development));

        let res = get(&router, "/api/getUserData", "").await;
        assert_eq!(res.status(), StatusCode::BadRequest);
        assert_eq!(body_json(&res), json!({ "error": "Principal ID is required" }));

        let res = get(&router, "/api/getUserData?principal=", "").await;
        assert_eq!(body_json(&res), json!({ "error": "Principal ID is required" }));

        let res = get(&router, "/api/getUserData?principal=invalid-principal", "").await;
        assert_eq!(res.status(), StatusCode::BadRequest);
        assert_eq!(body_json(&res), json!({ "error": "Invalid Principal ID format" }));
        assert_eq!(res.headers().get("Cache-Control"), Some("public, max-age=300"));
        assert!(res.headers().get("ETag").is_some());

        assert_eq!(users.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn user_data_is_cached_and_revalidated() {
        let users = Arc::new(Users::default());
        let audit = Arc::new(SqliteAuditLog::open_in_memory().unwrap());
        let router = router(state(
            Arc::clone(&audit) as Arc<dyn AuditLog>,
            users,
            Environment::Development,
        ));
        let target = format!("/api/getUserData?principal={PRINCIPAL}");

        let first = get(&router, &target, "").await;
        assert_eq!(first.status(), StatusCode::Ok);
        assert_eq!(first.headers().get("Cache-Control"), Some("public, max-age=300"));
        assert_eq!(body_json(&first)["principal"], PRINCIPAL);
        let etag = first.headers().get("ETag").unwrap().to_owned();

        let second = get(&router, &target, &format!("If-None-Match: {etag}\r\n")).await;
        assert_eq!(second.status(), StatusCode::NotModified);
        assert!(second.body_ref().is_empty());
        assert_eq!(second.headers().get("ETag"), Some(etag.as_str()));

        let logged = audit.recent(10).await.unwrap();
        assert_eq!(logged.len(), 2);
        assert!(logged.iter().all(|row| row.principal == PRINCIPAL));
    }

    #[tokio::test]
    async fn rejected_input_is_never_turned_into_304() {
        let users = Arc::new(Users::default());
        let audit = Arc::new(SqliteAuditLog::open_in_memory().unwrap());
        let router = router(state(audit, users, Environment::Development));
        let target = "/api/getUserData?principal=invalid-principal";

        let first = get(&router, target, "").await;
        let etag = first.headers().get("ETag").unwrap().to_owned();

        let second = get(&router, target, &format!("If-None-Match: {etag}\r\n")).await;
        assert_eq!(second.status(), StatusCode::BadRequest);
        assert_eq!(body_json(&second), json!({ "error": "Invalid Principal ID format" }));
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_the_lookup() {
        let users = Arc::new(Users::default());
        let router = router(state(
            Arc::new(BrokenAudit),
            Arc::clone(&users),
            Environment::Development,
        ));

        let res = get(&router, &format!("/api/getUserData?principal={PRINCIPAL}"), "").await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(users.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn token_metadata_failures() {
        let users = Arc::new(Users::default());
        let audit = Arc::new(SqliteAuditLog::open_in_memory().unwrap());
        let router = router(state(audit, users, Environment::Development));

        let res = get(&router, "/api/getMemecoinPrice", "").await;
        assert_eq!(body_json(&res), json!({ "error": "Token contract address is required" }));

        let res = get(&router, "/api/getMemecoinPrice?contract=abc", "").await;
        assert_eq!(res.status(), StatusCode::BadRequest);
        assert_eq!(body_json(&res), json!({ "error": "Invalid Solana token address format" }));

        let res = get(&router, &format!("/api/getMemecoinPrice?contract={MINT}"), "").await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
        assert_eq!(
            body_json(&res),
            json!({
                "error": "Failed to fetch token metadata",
                "details": "Solana RPC URL not configured"
            })
        );
        assert_eq!(res.headers().get("Cache-Control"), Some("public, max-age=3600"));
    }

    #[tokio::test]
    async fn debug_route_masks_secrets_and_is_hidden_in_production() {
        let audit: Arc<dyn AuditLog> = Arc::new(SqliteAuditLog::open_in_memory().unwrap());
        let users = Arc::new(Users::default());
        let dev = router(state(Arc::clone(&audit), users, Environment::Development));
        let res = get(&dev, "/api/debug", "").await;
        assert_eq!(res.status(), StatusCode::Ok);
        let body = body_json(&res);
        assert_eq!(body["env"]["APP_ENV"], "development");
        assert_eq!(body["env"]["SOLANA_RPC_URL"], "not configured");

        let prod = router(state(audit, Arc::new(Users::default()), Environment::Production));
        let res = get(&prod, "/api/debug", "").await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn cors_headers_reach_every_response() {
        let audit = Arc::new(SqliteAuditLog::open_in_memory().unwrap());
        let router = router(state(audit, Arc::new(Users::default()), Environment::Development));

        let res = get(&router, "/nope", "Origin: https://app.example\r\n").await;
        assert_eq!(res.status(), StatusCode::NotFound);
        assert!(res.headers().get("Access-Control-Allow-Origin").is_some());
    }
}
