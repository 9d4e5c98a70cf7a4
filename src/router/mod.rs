//! Request routing: map exact paths and methods to handlers.
//!
//! Every dispatch runs the router's global middleware first, then the matched
//! route's own middleware, then its handler. Unmatched requests still pass
//! through the global middleware so they are logged and get CORS headers.
//!
//! Trailing slashes are normalized on both registered and incoming paths, so
//! `/health/` and `/health` are equivalent.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::middleware::{MiddlewareHandler, Next};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased async handler producing a [`Response`] from a [`Context`].
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

fn into_handler<H, F>(handler: H) -> Handler
where
    H: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    Arc::new(
        move |ctx: Context| -> Pin<Box<dyn Future<Output = Response> + Send>> {
            Box::pin(handler(ctx))
        },
    )
}

fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

struct Route {
    method: Method,
    path: String,
    middlewares: Vec<MiddlewareHandler>,
    handler: Handler,
}

/// HTTP request router.
///
/// Routes are matched in registration order on method and exact path. A path
/// registered under a different method answers `405 Method Not Allowed` with an
/// `Allow` header; an unknown path answers `404 Not Found`.
///
/// # Examples
///
/// ```rust,no_run
/// use ledger_gateway::{Router, Response, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/health", |_ctx| async { Response::new(StatusCode::Ok) });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    middlewares: Vec<MiddlewareHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware run for every request, matched or not.
    pub fn layer(&mut self, middleware: MiddlewareHandler) {
        self.middlewares.push(middleware);
    }

    /// Registers a `GET` handler.
    pub fn get<H, F>(&mut self, path: &str, handler: H)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.add_route(Method::Get, path, Vec::new(), handler);
    }

    /// Registers a `GET` handler behind route-specific middleware.
    ///
    /// `middlewares` run in order after the global ones, closest to the handler last.
    pub fn get_with<H, F>(&mut self, path: &str, middlewares: Vec<MiddlewareHandler>, handler: H)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.add_route(Method::Get, path, middlewares, handler);
    }

    /// Registers a handler for an arbitrary method.
    pub fn add_route<H, F>(
        &mut self,
        method: Method,
        path: &str,
        middlewares: Vec<MiddlewareHandler>,
        handler: H,
    ) where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: normalize(path).to_owned(),
            middlewares,
            handler: into_handler(handler),
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatches `request` through the middleware chain to its handler.
    pub async fn dispatch(&self, request: Request) -> Response {
        let path = normalize(request.path());
        let matched = self
            .routes
            .iter()
            .find(|r| r.path == path && &r.method == request.method());

        let (chain, endpoint) = match matched {
            Some(route) => {
                let chain = self
                    .middlewares
                    .iter()
                    .chain(route.middlewares.iter())
                    .cloned()
                    .collect();
                (chain, Arc::clone(&route.handler))
            }
            None => (self.middlewares.clone(), self.fallback(path)),
        };

        Next::new(chain, endpoint).run(Context::new(request)).await
    }

    // 405 with `Allow` when the path exists under other methods, else 404.
    fn fallback(&self, path: &str) -> Handler {
        let allowed: Vec<&str> = self
            .routes
            .iter()
            .filter(|r| r.path == path)
            .map(|r| r.method.as_str())
            .collect();

        if allowed.is_empty() {
            into_handler(|_ctx| async { Response::new(StatusCode::NotFound).body("Not Found") })
        } else {
            let allow = allowed.join(", ");
            into_handler(move |_ctx| {
                let allow = allow.clone();
                async move {
                    Response::new(StatusCode::MethodNotAllowed)
                        .header("Allow", allow)
                        .body("Method Not Allowed")
                }
            })
        }
    }
}
