//! HTTP listener.
//!
//! One wildcard entry point: every path, for GET, POST, PUT and DELETE, goes
//! to the [`Router`]. Other methods get `405` here and never reach it.
//!
//! # Worker pool
//!
//! At most `workers` connections are served at once. The accept loop takes a
//! semaphore permit before it accepts, so excess clients wait in the kernel
//! backlog rather than in memory.
//!
//! # Request bodies
//!
//! Bodies are collected in full before routing, up to `max_body` bytes. A
//! longer body is answered with `413` and never reaches the router.
//!
//! # Shutdown
//!
//! When the shutdown channel fires the loop stops accepting, aborts every
//! connection still open and drops the listener. A file mid-transfer is cut
//! short; clients retry.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::{HttpBody, Response};
use crate::router::Router;
use crate::status::Status;

/// Attempts made to bind the listener before giving up.
pub const BIND_ATTEMPTS: u32 = 3;
/// Pause between bind attempts.
pub const BIND_BACKOFF: Duration = Duration::from_secs(1);
/// A client must finish sending request headers within this window.
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Binds `addr`, retrying [`BIND_ATTEMPTS`] times [`BIND_BACKOFF`] apart.
pub(crate) async fn bind(addr: SocketAddr) -> Result<TcpListener, Error> {
    let mut attempt = 1;
    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if attempt >= BIND_ATTEMPTS => {
                error!(%addr, attempts = attempt, "giving up on HTTP listener: {e}");
                return Err(Error::BindExhausted { attempts: attempt, source: e });
            }
            Err(e) => {
                warn!(%addr, attempt, "failed to bind HTTP listener: {e}");
                tokio::time::sleep(BIND_BACKOFF).await;
                attempt += 1;
            }
        }
    }
}

/// Serves `listener` in the background until `shutdown` fires.
pub(crate) fn spawn(
    listener: TcpListener,
    router: Arc<Router>,
    workers: usize,
    max_body: usize,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(serve(listener, router, workers, max_body, shutdown))
}

async fn serve(
    listener: TcpListener,
    router: Arc<Router>,
    workers: usize,
    max_body: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    loop {
        let permit = tokio::select! {
            biased;

            _ = shutdown.changed() => break,

            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };

        let (stream, peer) = tokio::select! {
            biased;

            _ = shutdown.changed() => break,

            res = listener.accept() => match res {
                Ok(v) => v,
                Err(e) => {
                    error!("accept error: {e}");
                    continue;
                }
            },

            // Reap finished connections so the set does not grow without bound.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => continue,
        };

        let router = Arc::clone(&router);
        let io = TokioIo::new(stream);

        tasks.spawn(async move {
            let _permit = permit;
            let svc = service_fn(move |req| {
                let router = Arc::clone(&router);
                async move { dispatch(router, req, max_body).await }
            });

            if let Err(e) = http1::Builder::new()
                .timer(TokioTimer::new())
                .header_read_timeout(HEADER_READ_TIMEOUT)
                .serve_connection(io, svc)
                .await
            {
                warn!(%peer, "connection error: {e}");
            }
        });
    }

    info!(in_flight = tasks.len(), "HTTP listener shutting down");
    tasks.shutdown().await;
    drop(listener);
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Turns one hyper request into one response. Never fails: every problem is
/// answered with an HTTP status.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    max_body: usize,
) -> Result<http::Response<HttpBody>, Infallible> {
    let Ok(method) = Method::try_from(req.method()) else {
        debug!(method = %req.method(), "method not allowed");
        let res = Response::builder()
            .status(Status::MethodNotAllowed)
            .header("allow", "GET, POST, PUT, DELETE")
            .no_body();
        return Ok(res.into_inner());
    };

    let target = req.uri().path_and_query().map_or("/", |pq| pq.as_str()).to_owned();
    let headers = req.headers().iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();

    let body = match Limited::new(req.into_body(), max_body).collect().await {
        Ok(collected) => collected.to_bytes().to_vec(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(%target, max_body, "request body too large");
            return Ok(Response::status(Status::ContentTooLarge).into_inner());
        }
        Err(e) => {
            warn!(%target, "failed to read request body: {e}");
            return Ok(Response::status(Status::BadRequest).into_inner());
        }
    };

    let res = router.route(Request::new(method, target, headers, body)).await;
    Ok(res.into_inner())
}
