//! Cross-origin access control for browser clients.

mod cors;

pub use cors::CorsMiddleware;
