//! Hello-world app with every response timed.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example hello
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i 'http://localhost:3000/items/5?q=somequery'
//!   curl -i http://localhost:3000/items/five
//!
//! Every response carries `x-process-time`, the seconds spent producing it.
//! Set `LAPSE_ADDR` to listen somewhere other than `0.0.0.0:3000`.

use lapse::middleware::ProcessTime;
use lapse::{Config, Request, Response, Router, Server, StatusCode};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), lapse::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let app = Router::new()
        .get("/", read_root)
        .get("/items/{item_id}", read_item)
        .layer(ProcessTime::new());

    Server::from_config(&config).serve(app).await
}

// GET /
async fn read_root(_req: Request) -> Response {
    Response::json(br#"{"Hello":"World"}"#.to_vec())
}

// GET /items/{item_id}?q=...
//
// item_id must be an integer; q is optional.
async fn read_item(req: Request) -> Response {
    let Some(item_id) = req.param("item_id").and_then(|id| id.parse::<i64>().ok()) else {
        return Response::builder()
            .status(StatusCode::UNPROCESSABLE_ENTITY)
            .json(br#"{"detail":"item_id must be an integer"}"#.to_vec());
    };

    let body = json!({ "item_id": item_id, "q": req.query("q") });
    Response::json(body.to_string().into_bytes())
}
