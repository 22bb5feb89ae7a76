//! Request-latency header.
//!
//! [`ProcessTime`] measures how long everything downstream of it takes to
//! produce a response and writes the elapsed seconds into a response header:
//!
//! ```text
//! X-Process-Time: 0.050213
//! ```
//!
//! Register it last to time the whole pipeline, or earlier to time only the
//! stages registered before it:
//!
//! ```rust,no_run
//! use lapse::middleware::ProcessTime;
//! use lapse::{Request, Response, Router};
//!
//! # async fn ping(_: Request) -> Response { Response::text("pong") }
//! let app = Router::new()
//!     .get("/ping", ping)
//!     .layer(ProcessTime::new());
//! ```
//!
//! The value is `f64` seconds printed with Rust's shortest round-trip
//! formatting. Clients should parse it as a number, not match on its text.

use std::borrow::Cow;

use http::HeaderName;
use tokio::time::Instant;

use super::{Middleware, Next};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

/// Default header written by [`ProcessTime`].
pub const PROCESS_TIME_HEADER: &str = "X-Process-Time";

/// Stamps downstream processing time onto every response.
///
/// If downstream fails, the error is returned as is and nothing is written.
#[derive(Clone, Debug)]
pub struct ProcessTime {
    header: Cow<'static, str>,
}

impl ProcessTime {
    /// Writes the elapsed time under `X-Process-Time`.
    pub fn new() -> Self {
        Self { header: Cow::Borrowed(PROCESS_TIME_HEADER) }
    }

    /// Writes the elapsed time under `header` instead of `X-Process-Time`.
    ///
    /// # Panics
    ///
    /// Panics if `header` is not a valid HTTP header name. Middleware is
    /// built at startup, so this is a programming error.
    pub fn with_header(header: impl Into<Cow<'static, str>>) -> Self {
        let header = header.into();
        if let Err(e) = HeaderName::from_bytes(header.as_bytes()) {
            panic!("invalid header name `{header}`: {e}");
        }
        Self { header }
    }

    /// The header the elapsed time is written under.
    pub fn header_name(&self) -> &str {
        &self.header
    }
}

impl Default for ProcessTime {
    fn default() -> Self { Self::new() }
}

impl Middleware for ProcessTime {
    fn handle(&self, req: Request, next: Next) -> BoxFuture<Result<Response, Error>> {
        let header = self.header.clone();
        Box::pin(async move {
            let start = Instant::now();
            let mut res = next.run(req).await?;
            let elapsed = start.elapsed().as_secs_f64();
            res.set_header(&header, elapsed.to_string());
            Ok(res)
        })
    }
}
