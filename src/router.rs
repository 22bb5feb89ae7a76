//! Radix-tree request router and the middleware pipeline around it.
//!
//! One tree per HTTP method, O(path-length) lookup. Middleware registered with
//! [`Router::layer`] wraps the whole route table.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Every registration returns `self` so calls chain naturally.
pub struct Router {
    routes: Routes,
    // Outermost first.
    middleware: Vec<BoxedMiddleware>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Routes::default(), middleware: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax and are read with `req.param("name")`:
    ///
    /// ```rust,no_run
    /// # use lapse::{Method, Request, Response, Router};
    /// # async fn read_item(_: Request) -> Response { Response::text("") }
    /// # async fn delete_item(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,    "/items/{item_id}", read_item)
    ///     .on(Method::DELETE, "/items/{item_id}", delete_item);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup, so this is a
    /// programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes.tree
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Wrap every route in `middleware`.
    ///
    /// The most recently registered middleware runs outermost.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middleware.insert(0, Arc::new(middleware));
        self
    }

    /// Freezes the router into a [`Pipeline`] that can be shared across tasks.
    pub fn into_pipeline(self) -> Pipeline {
        Pipeline {
            stack: self.middleware.into(),
            routes: Arc::new(self.routes),
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// A frozen router: middleware stack plus route table.
///
/// [`Server`](crate::Server) drives one of these per request. It is equally
/// usable without a socket, which is how the tests exercise an application.
#[derive(Clone)]
pub struct Pipeline {
    stack: Arc<[BoxedMiddleware]>,
    routes: Arc<Routes>,
}

impl Pipeline {
    /// Runs `req` through every middleware and the matching handler.
    pub async fn call(&self, req: Request) -> Result<Response, Error> {
        Next::new(Arc::clone(&self.stack), Arc::clone(&self.routes))
            .run(req)
            .await
    }
}

// ── Routes ────────────────────────────────────────────────────────────────────

/// The innermost stage of every pipeline.
#[derive(Default)]
pub(crate) struct Routes {
    tree: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Routes {
    /// Finds the handler for `req`, fills in its path params and runs it.
    ///
    /// No match under the request's method is `405` when another method
    /// matches the path, `404` otherwise.
    pub(crate) async fn dispatch(&self, mut req: Request) -> Result<Response, Error> {
        match self.lookup(&req.method, &req.path) {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req).await
            }
            None if self.matches_other_method(&req.method, &req.path) => {
                Ok(Response::status(StatusCode::METHOD_NOT_ALLOWED))
            }
            None => Ok(Response::status(StatusCode::NOT_FOUND)),
        }
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.tree.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    fn matches_other_method(&self, method: &Method, path: &str) -> bool {
        self.tree.iter()
            .any(|(m, tree)| m != method && tree.at(path).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_item(req: Request) -> Response {
        Response::text(format!("item {}", req.param("item_id").unwrap_or("?")))
    }

    fn app() -> Pipeline {
        Router::new()
            .get("/items/{item_id}", read_item)
            .post("/items", |_req: Request| async { StatusCode::CREATED })
            .into_pipeline()
    }

    #[tokio::test]
    async fn routes_with_path_params() {
        let res = app().call(Request::builder(Method::GET, "/items/42?q=x").build()).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"item 42");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let res = app().call(Request::builder(Method::GET, "/users").build()).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let res = app().call(Request::builder(Method::DELETE, "/items").build()).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_route_panics() {
        let _ = Router::new()
            .get("/items/{id}", read_item)
            .get("/items/{item_id}", read_item);
    }
}
