//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in a single
//! `HashMap<Method, Tree>`, so each one is hidden behind a common trait object
//! (`dyn ErasedHandler`):
//!
//! ```text
//! async fn ping(req: Request) -> Response { … }      ← user writes this
//!        ↓ router.get("/ping", ping)
//! ping.into_boxed_handler()                          ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(ping))                          ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time                 ← one vtable dispatch
//!        ↓
//! Box::pin(async { ping(req).await.into_result() })  ← BoxFuture
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResult, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future, `Send` so tokio may move it across
/// worker threads.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<Result<Response, Error>>;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` with
/// the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResult
/// ```
///
/// i.e. returning a [`Response`], anything else that is
/// [`IntoResponse`](crate::IntoResponse), or a `Result` of one.
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Result<Response, Error>> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_result() })
    }
}
