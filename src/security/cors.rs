use std::{future::Future, pin::Pin, sync::Arc};

use crate::{
    Method, Response, StatusCode,
    context::Context,
    http::headers::names,
    middleware::{Middleware, Next},
};

/// CORS middleware.
///
/// - Requests without an `Origin`, or from an origin outside the allow-list,
///   pass through unmodified.
/// - `OPTIONS` preflights are answered with `204 No Content` and never reach
///   the route.
/// - Other requests run normally and get `Access-Control-*` headers appended.
///   `ETag` is exposed so browser scripts can replay it in `If-None-Match`.
///
/// Specific (non-wildcard) origins are echoed back with `Vary: Origin`.
///
/// # Examples
///
/// ```rust
/// use ledger_gateway::security::CorsMiddleware;
///
/// let permissive = CorsMiddleware::permissive();
/// let strict = CorsMiddleware::with_origins(["https://app.example.com"]);
/// ```
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    policy: Arc<CorsPolicy>,
}

#[derive(Debug)]
struct CorsPolicy {
    origins: Vec<String>,
    methods: String,
    headers: String,
}

impl CorsPolicy {
    // The value for `Access-Control-Allow-Origin`, or `None` when the origin is refused.
    fn allow_origin(&self, origin: &str) -> Option<String> {
        if self.origins.iter().any(|o| o == "*") {
            Some("*".to_owned())
        } else if self.origins.iter().any(|o| o == origin) {
            Some(origin.to_owned())
        } else {
            None
        }
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::permissive()
    }
}

impl CorsMiddleware {
    /// Any origin, `Access-Control-Allow-Origin: *`.
    pub fn permissive() -> Self {
        Self::with_origins(["*"])
    }

    /// Only the listed origins. `"*"` in the list allows all.
    pub fn with_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            policy: Arc::new(CorsPolicy {
                origins: origins.into_iter().map(Into::into).collect(),
                methods: "GET, OPTIONS".to_owned(),
                headers: format!("{}, {}", names::CONTENT_TYPE, names::IF_NONE_MATCH),
            }),
        }
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let policy = Arc::clone(&self.policy);

        Box::pin(async move {
            let allowed = ctx
                .request()
                .headers()
                .get(names::ORIGIN)
                .and_then(|origin| policy.allow_origin(origin));
            let Some(allow_origin) = allowed else {
                return next.run(ctx).await;
            };
            let is_wildcard = allow_origin == "*";

            if ctx.request().method() == &Method::Options {
                let mut resp = Response::new(StatusCode::NoContent)
                    .header("Access-Control-Allow-Origin", &allow_origin)
                    .header("Access-Control-Allow-Methods", &policy.methods)
                    .header("Access-Control-Allow-Headers", &policy.headers)
                    .header("Access-Control-Max-Age", "3600");
                if !is_wildcard {
                    resp.add_header(names::VARY, "Origin");
                }
                return resp;
            }

            let mut resp = next.run(ctx).await;
            resp.add_header("Access-Control-Allow-Origin", &allow_origin);
            resp.add_header("Access-Control-Expose-Headers", names::ETAG);
            if !is_wildcard {
                resp.add_header(names::VARY, "Origin");
            }
            resp
        })
    }
}
