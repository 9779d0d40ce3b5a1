//! Application callbacks for custom portal endpoints.
//!
//! A portal usually exposes a handful of its own endpoints next to the
//! captive pages: a status probe for the setup app, a form target that saves
//! Wi-Fi credentials. Each is an `async fn(Request) -> impl IntoResponse`
//! registered for one `(path, method)` pair, and it outranks both the probe
//! answers and the static files for that pair.
//!
//! The callback is erased exactly once, at registration, into an
//! `Arc<dyn ErasedHandler>`. The registry never mutates a table in place; it
//! builds a new snapshot per registration, and every snapshot holds clones of
//! the same `Arc`s. A request that looked its handler up in an older
//! snapshot keeps running it while newer registrations land.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A boxed future resolving to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe dispatch interface behind [`Handler`].
///
/// `#[doc(hidden)] pub` only because it appears in `Handler`'s signature.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A registered handler, shared between the registry snapshot and every
/// request currently running it.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid custom handler.
///
/// Satisfied automatically by any function or closure of the shape
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Sealed: only the blanket impl below can provide it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Holds a concrete callback `F` and exposes it as an [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::status::Status;

    async fn teapot(_req: Request) -> Status {
        Status::Conflict
    }

    #[tokio::test]
    async fn async_fn_becomes_handler() {
        let handler = teapot.into_boxed_handler();
        let res = handler.call(Request::new(Method::Get, "/", Vec::new(), Vec::new())).await;

        assert_eq!(res.status_code(), 409);
    }

    #[tokio::test]
    async fn closure_becomes_handler() {
        let greeting = String::from("hello");
        let handler = (move |req: Request| {
            let body = format!("{greeting} {}", req.path());
            async move { body }
        })
        .into_boxed_handler();

        let res = handler.call(Request::new(Method::Post, "/world", Vec::new(), Vec::new())).await;

        assert_eq!(&res.into_bytes().await[..], b"hello /world");
    }
}
