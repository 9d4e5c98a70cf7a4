//! Async TCP server using Tokio.
//!
//! Accepts connections, parses HTTP/1.1 requests and hands each one to a
//! shared [`Router`]. Connections are persistent unless the client asks
//! otherwise.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::Router;
use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Largest request we buffer before answering 413 (1 MiB). The gateway only
/// serves bodiless GETs.
const MAX_REQUEST_SIZE: usize = 1024 * 1024;

const INITIAL_BUF_SIZE: usize = 4096;

/// The gateway's HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use ledger_gateway::{Response, Router, Server, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut router = Router::new();
///     router.get("/health", |_ctx| async { Response::new(StatusCode::Ok) });
///
///     let server = Server::bind("127.0.0.1:3000").await?;
///     server.run(router).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves `router` until the process is terminated.
    pub async fn run(self, router: Router) -> Result<(), ServerError> {
        self.run_until(router, std::future::pending()).await
    }

    /// Serves `router` until `shutdown` resolves.
    ///
    /// Stops accepting new connections at that point; connections already
    /// being served finish their current request on their own tasks.
    pub async fn run_until<S>(self, router: Router, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let router = Arc::new(router);
        info!(address = %self.local_addr, routes = router.len(), "gateway listening");

        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let router = Arc::clone(&router);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, router).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Serves requests on one connection until the peer closes it or a request
/// asks for `Connection: close`.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    router: Arc<Router>,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let bytes_read = stream.read_buf(&mut buf).await?;

        if bytes_read == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }

        if buf.len() > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "request too large, sending 413");
            return reject(&mut stream, StatusCode::PayloadTooLarge, "Request entity too large").await;
        }

        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => continue,
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                return reject(&mut stream, StatusCode::BadRequest, format!("Bad Request: {e}"))
                    .await;
            }
        };

        let total_needed = body_offset.checked_add(request.content_length().unwrap_or(0));
        let Some(total_needed) = total_needed.filter(|&n| n <= MAX_REQUEST_SIZE) else {
            warn!(peer = %peer_addr, "declared body too large, sending 413");
            return reject(&mut stream, StatusCode::PayloadTooLarge, "Request entity too large").await;
        };
        if buf.len() < total_needed {
            continue;
        }

        let keep_alive = request.is_keep_alive();
        let response = router.dispatch(request).await.keep_alive(keep_alive);
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;

        let _ = buf.split_to(total_needed);

        if !keep_alive {
            break;
        }
    }

    Ok(())
}

/// Writes a final error response and closes the connection.
async fn reject(
    stream: &mut TcpStream,
    status: StatusCode,
    body: impl Into<String>,
) -> Result<(), std::io::Error> {
    let response = Response::new(status).body(body).keep_alive(false);
    stream.write_all(&response.into_bytes()).await?;
    stream.flush().await
}
