//! # lapse
//!
//! A minimal HTTP framework for Rust services behind a reverse proxy, built
//! around one piece of middleware: [`ProcessTime`](middleware::ProcessTime),
//! which stamps every response with how long the server spent producing it.
//!
//! ```text
//! HTTP/1.1 200 OK
//! content-type: application/json
//! x-process-time: 0.000412
//! ```
//!
//! What's here:
//!
//! - Radix-tree routing via [`matchit`]
//! - A middleware pipeline: implement [`middleware::Middleware`] or wrap an
//!   `async fn` with [`middleware::from_fn`], register with [`Router::layer`]
//! - hyper HTTP/1.1 + HTTP/2, graceful shutdown on SIGTERM / Ctrl-C
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use lapse::middleware::ProcessTime;
//! use lapse::{Config, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lapse::Error> {
//!     let app = Router::new()
//!         .get("/items/{item_id}", read_item)
//!         .layer(ProcessTime::new());
//!
//!     Server::from_config(&Config::from_env()?).serve(app).await
//! }
//!
//! async fn read_item(req: Request) -> Response {
//!     let id = req.param("item_id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"item_id":"{id}"}}"#).into_bytes())
//! }
//! ```

mod config;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use config::Config;
pub use error::{BoxError, Error};
pub use handler::{BoxFuture, Handler};
pub use http::{Method, StatusCode};
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, IntoResponse, IntoResult, Response, ResponseBuilder};
pub use router::{Pipeline, Router};
pub use server::Server;
