//! Middleware layer.
//!
//! Middleware wraps the rest of the pipeline: it sees the request on the way
//! in, decides when (and whether) to call [`Next::run`], and sees the response
//! on the way out. It is the place for cross-cutting concerns such as latency
//! headers, request ids or auth-header inspection.
//!
//! There are two ways to write one. Implement [`Middleware`] on a type, as
//! [`ProcessTime`] does, or adapt a plain `async fn` with [`from_fn`]:
//!
//! ```rust,no_run
//! use lapse::middleware::{from_fn, Next};
//! use lapse::{Error, Request, Response, Router};
//!
//! async fn add_server_header(req: Request, next: Next) -> Result<Response, Error> {
//!     let mut res = next.run(req).await?;
//!     res.set_header("server", "lapse");
//!     Ok(res)
//! }
//!
//! let app = Router::new().layer(from_fn(add_server_header));
//! ```
//!
//! # Ordering
//!
//! The **last** registered middleware is the outermost one: it receives the
//! request first and the response last. Middleware wraps routing itself, so
//! `404` and `405` answers pass through it too.

mod process_time;

pub use process_time::{PROCESS_TIME_HEADER, ProcessTime};

use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;
use crate::router::Routes;

/// A stage of the request pipeline.
pub trait Middleware: Send + Sync + 'static {
    /// Handles one request. Call `next.run(req)` to continue down the
    /// pipeline; `next` is consumed, so downstream runs at most once.
    fn handle(&self, req: Request, next: Next) -> BoxFuture<Result<Response, Error>>;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The rest of the pipeline, as seen from one middleware.
///
/// Holds the stages still to run and the route table at the end of them.
pub struct Next {
    stack: Arc<[BoxedMiddleware]>,
    index: usize,
    routes: Arc<Routes>,
}

impl Next {
    pub(crate) fn new(stack: Arc<[BoxedMiddleware]>, routes: Arc<Routes>) -> Self {
        Self { stack, index: 0, routes }
    }

    /// Runs every remaining stage and the matched handler.
    ///
    /// Errors come back exactly as the failing stage returned them.
    pub async fn run(self, req: Request) -> Result<Response, Error> {
        match self.stack.get(self.index).cloned() {
            Some(middleware) => {
                let next = Self { index: self.index + 1, ..self };
                middleware.handle(req, next).await
            }
            None => self.routes.dispatch(req).await,
        }
    }
}

/// Adapts an `async fn(Request, Next) -> Result<Response, Error>` into a
/// [`Middleware`].
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    FromFn(f)
}

/// Middleware built by [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn handle(&self, req: Request, next: Next) -> BoxFuture<Result<Response, Error>> {
        Box::pin((self.0)(req, next))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{Method, StatusCode};

    use super::*;
    use crate::router::Router;

    fn get(path: &str) -> Request {
        Request::builder(Method::GET, path).build()
    }

    async fn ok(_req: Request) -> Response {
        Response::text("ok")
    }

    #[tokio::test]
    async fn last_registered_runs_outermost() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let stage = |name: &'static str| {
            let trace = Arc::clone(&trace);
            from_fn(move |req, next: Next| {
                let trace = Arc::clone(&trace);
                async move {
                    trace.lock().unwrap().push(format!("{name} in"));
                    let res = next.run(req).await;
                    trace.lock().unwrap().push(format!("{name} out"));
                    res
                }
            })
        };

        let app = Router::new()
            .get("/", ok)
            .layer(stage("inner"))
            .layer(stage("outer"))
            .into_pipeline();
        app.call(get("/")).await.unwrap();

        assert_eq!(*trace.lock().unwrap(), ["outer in", "inner in", "inner out", "outer out"]);
    }

    #[tokio::test]
    async fn middleware_can_answer_without_calling_next() {
        let app = Router::new()
            .get("/", ok)
            .layer(from_fn(|_req, _next| async {
                Ok(Response::status(StatusCode::UNAUTHORIZED))
            }))
            .into_pipeline();

        let res = app.call(get("/")).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn middleware_wraps_unmatched_routes() {
        let app = Router::new()
            .get("/", ok)
            .layer(from_fn(|req, next: Next| async move {
                let mut res = next.run(req).await?;
                res.set_header("x-seen", "1");
                Ok(res)
            }))
            .into_pipeline();

        let res = app.call(get("/nowhere")).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.header("x-seen"), Some("1"));
    }
}
