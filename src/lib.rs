//! # ledger-gateway
//!
//! A small REST gateway in front of an Internet Computer canister (per-user
//! referral data) and Solana token metadata, built on a from-scratch async
//! HTTP/1.1 stack.
//!
//! Responses are validated with content fingerprints: every cached route
//! advertises `Cache-Control` and `ETag`, and answers `304 Not Modified` when
//! the client already holds the current body.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ledger_gateway::{Response, Router, StatusCode, server::Server};
//! use ledger_gateway::cache::ConditionalCache;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new();
//!     router.get_with(
//!         "/greeting",
//!         vec![ConditionalCache::default().into_handler()],
//!         |_ctx| async { Response::new(StatusCode::Ok).body("Hello, World!") },
//!     );
//!
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     server.run(router).await?;
//!     Ok(())
//! }
//! ```

use std::{future::Future, pin::Pin};

// ── HTTP stack ────────────────────────────────────────────────────────────────
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;

// ── Conditional response caching ──────────────────────────────────────────────
pub mod cache;

// ── Application ───────────────────────────────────────────────────────────────
pub mod api;
pub mod config;
pub mod database;
pub mod upstream;
pub mod validation;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};

/// A boxed, `Send` future, the return type of the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
