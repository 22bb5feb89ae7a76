//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`, so no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Pipeline, Router};

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use lapse::Server;
    /// let server = Server::bind("0.0.0.0:3000".parse().unwrap());
    /// ```
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::bind(config.addr)
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `signal`
    /// resolves instead of on SIGTERM / Ctrl-C.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        run(listener, router.into_pipeline(), signal).await;
        Ok(())
    }
}

/// Accept loop: one task per connection until `shutdown` resolves, then drain.
async fn run(listener: TcpListener, pipeline: Pipeline, shutdown: impl Future<Output = ()>) {
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "lapse listening"),
        Err(e) => warn!("listening on unknown address: {e}"),
    }

    let mut tasks = tokio::task::JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Shutdown is checked first so a SIGTERM stops accepting at
            // once, even with connections still queued.
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let pipeline = pipeline.clone();
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let pipeline = pipeline.clone();
                        async move { dispatch(pipeline, req, remote_addr).await }
                    });

                    // HTTP/1.1 and HTTP/2, whichever the client speaks.
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on long-running servers.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}

    info!("lapse stopped");
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Hot path: one hyper request in, one hyper response out.
///
/// Every failure is answered here (400 for an unreadable body, 500 for a
/// pipeline error), so hyper never sees an error.
async fn dispatch(
    pipeline: Pipeline,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let req = match read_request(req).await {
        Ok(req) => req,
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_http());
        }
    };
    let method = req.method().clone();
    let path = req.path().to_owned();

    let response = match pipeline.call(req).await {
        Ok(res) => res,
        Err(e) => {
            error!(%method, %path, peer = %remote_addr, "request failed: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    debug!(%method, %path, status = response.status_code().as_u16(), "request completed");
    Ok(response.into_http())
}

async fn read_request(req: hyper::Request<Incoming>) -> Result<Request, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();

    let uri = match parts.uri.path_and_query() {
        Some(pq) => pq.as_str(),
        None => parts.uri.path(),
    };
    let mut builder = Request::builder(parts.method, uri).body(body.to_vec());
    for (name, value) in &parts.headers {
        // Non-UTF-8 header values are not representable in `Request`.
        if let Ok(value) = value.to_str() {
            builder = builder.header(name.as_str(), value);
        }
    }
    Ok(builder.build())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). Only Ctrl-C on Windows.
///
/// A handler that cannot be installed is logged and treated as a signal that
/// never arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    use super::*;
    use crate::middleware::ProcessTime;

    struct Reply {
        status: u16,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Reply {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    async fn send(addr: SocketAddr, raw: &str) -> Reply {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();

        let text = String::from_utf8(buf).unwrap();
        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        let mut lines = head.lines();
        let status = lines.next().unwrap().split(' ').nth(1).unwrap().parse().unwrap();
        let headers = lines
            .filter_map(|l| l.split_once(": "))
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Reply { status, headers, body: body.to_owned() }
    }

    async fn echo(req: Request) -> Response {
        let body = format!(
            "q={} agent={} body={}",
            req.query("q").unwrap_or_default(),
            req.header("x-agent").unwrap_or_default(),
            String::from_utf8_lossy(req.body()),
        );
        Response::text(body)
    }

    async fn boom(_req: Request) -> Result<Response, std::io::Error> {
        Err(std::io::Error::other("boom"))
    }

    #[tokio::test]
    async fn serves_timed_responses_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .post("/echo", echo)
            .get("/boom", boom)
            .layer(ProcessTime::new());
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, app.into_pipeline(), async move {
            let _ = stopped.await;
        }));

        let ok = send(addr, "POST /echo?q=some%20query HTTP/1.1\r\nhost: test\r\n\
            x-agent: curl-8\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello").await;
        assert_eq!(ok.status, 200);
        assert_eq!(ok.body, "q=some query agent=curl-8 body=hello");
        let elapsed: f64 = ok.header("x-process-time").unwrap().parse().unwrap();
        assert!(elapsed >= 0.0);

        let failed = send(addr, "GET /boom HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
        assert_eq!(failed.status, 500);
        assert_eq!(failed.header("x-process-time"), None);

        let missing = send(addr, "GET /nope HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
        assert_eq!(missing.status, 404);
        assert!(missing.header("x-process-time").is_some());

        stop.send(()).unwrap();
        server.await.unwrap();
    }
}
