//! Middleware pipeline: composable before/after request handler logic.
//!
//! Every request runs through an ordered chain: the router's global middleware,
//! then the matched route's own middleware, then the route's handler. Each layer
//! may pass the request on, short-circuit with its own [`Response`], or decorate
//! the downstream response on the way back out.
//!
//! ## Core types
//!
//! - [`Middleware`]: trait implemented by all middleware.
//! - [`Next`]: cursor into the remaining chain; [`Next::run`] advances it.
//! - [`MiddlewareHandler`]: type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`]: converts a [`Middleware`] into a [`MiddlewareHandler`].
//! - [`LoggerMiddleware`]: one log line per request.

use std::{future::Future, pin::Pin, sync::Arc};
use tokio::time::Instant;

use crate::{Response, context::Context, router::Handler};

/// A cursor into the remaining middleware chain for a single request.
///
/// When every middleware has run, [`Next::run`] invokes the chain's endpoint
/// handler. `Next` is consumed by `run`, so a layer can forward at most once.
///
/// # Examples
///
/// ```rust,no_run
/// use std::pin::Pin;
/// use ledger_gateway::{Response, context::Context, middleware::{Middleware, Next}};
///
/// struct PassThrough;
///
/// impl Middleware for PassThrough {
///     fn handle(
///         &self,
///         ctx: Context,
///         next: Next,
///     ) -> Pin<Box<dyn std::future::Future<Output = Response> + Send>> {
///         Box::pin(async move { next.run(ctx).await })
///     }
/// }
/// ```
pub struct Next {
    middlewares: Vec<MiddlewareHandler>,
    index: usize,
    endpoint: Handler,
}

/// A type-erased, reference-counted middleware function.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ledger_gateway::middleware::{LoggerMiddleware, from_middleware};
///
/// let handler = from_middleware(Arc::new(LoggerMiddleware));
/// ```
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

impl Next {
    /// Creates a cursor at the start of `middlewares`, ending in `endpoint`.
    pub fn new(middlewares: Vec<MiddlewareHandler>, endpoint: Handler) -> Self {
        Self {
            middlewares,
            index: 0,
            endpoint,
        }
    }

    /// Runs the next middleware, or the endpoint once the chain is exhausted.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.middlewares.get(self.index).cloned() {
            Some(middleware) => {
                self.index += 1;
                middleware(ctx, self).await
            }
            None => (self.endpoint)(ctx).await,
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors receive a [`Context`] and a [`Next`] cursor and may pass
/// through, short-circuit, or decorate the downstream [`Response`].
///
/// Implementations must be `Send + Sync` since one instance serves every
/// connection task, and the returned future must be `Send`.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// Logs each request's method, path, status, and duration after the
/// downstream chain completes. Never short-circuits.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().to_string();
            let path = ctx.request().path().to_owned();

            let response = next.run(ctx).await;

            tracing::info!(
                %method,
                %path,
                status = response.status().as_u16(),
                elapsed = ?start.elapsed(),
                "request completed"
            );

            response
        })
    }
}
