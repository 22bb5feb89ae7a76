//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it. Middleware receives the
//! same value on the way back out and may edit its headers in place with
//! [`Response::set_header`].

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

use crate::error::{BoxError, Error};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use lapse::{Response, StatusCode};
///
/// Response::json(br#"{"Hello":"World"}"#.to_vec());
/// Response::text("pong");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/items/42")
///     .json(br#"{"item_id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK` with `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::bytes_raw("application/json", body)
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::bytes_raw("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    fn bytes_raw(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            body,
            headers: vec![("content-type".to_owned(), content_type.to_owned())],
            status: StatusCode::OK,
        }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing any existing header with the same name
    /// (compared case-insensitively). All other headers are left as they are.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let first = self.headers.iter().position(|(k, _)| k.eq_ignore_ascii_case(name));
        match first {
            Some(first) => {
                self.headers[first].1 = value;
                // Later duplicates go, so the header ends up with one value.
                let mut index = 0;
                self.headers.retain(|(k, _)| {
                    let keep = index <= first || !k.eq_ignore_ascii_case(name);
                    index += 1;
                    keep
                });
            }
            None => self.headers.push((name.to_owned(), value)),
        }
    }

    /// Converts into a hyper-ready response.
    ///
    /// Headers whose name or value is not valid HTTP are dropped; they can only
    /// come from handler code and hyper would refuse to write them anyway.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status;
        let headers = res.headers_mut();
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(&value),
            ) {
                headers.append(name, value);
            }
        }
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish("application/json", body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into().into_bytes())
    }

    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type.as_str(), body)
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

// ── IntoResult ────────────────────────────────────────────────────────────────

/// What a handler may return: anything [`IntoResponse`], or a `Result` whose
/// error fails the request.
///
/// A failed handler is not turned into a response here. The error travels
/// back up through every middleware untouched, and the server answers `500`.
pub trait IntoResult {
    fn into_result(self) -> Result<Response, Error>;
}

impl<T: IntoResponse> IntoResult for T {
    fn into_result(self) -> Result<Response, Error> {
        Ok(self.into_response())
    }
}

impl<T, E> IntoResult for Result<T, E>
where
    T: IntoResponse,
    E: Into<BoxError>,
{
    fn into_result(self) -> Result<Response, Error> {
        self.map(IntoResponse::into_response).map_err(Error::handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_header_appends_new_name() {
        let mut res = Response::text("pong");
        res.set_header("X-Process-Time", "0.5");
        assert_eq!(res.headers(), &[
            ("content-type".to_owned(), "text/plain; charset=utf-8".to_owned()),
            ("X-Process-Time".to_owned(), "0.5".to_owned()),
        ]);
    }

    #[test]
    fn set_header_overwrites_case_insensitively() {
        let mut res = Response::builder()
            .header("x-process-time", "stale")
            .header("etag", "\"abc\"")
            .header("X-PROCESS-TIME", "also stale")
            .text("pong");
        res.set_header("X-Process-Time", "0.25");

        assert_eq!(res.header("x-process-time"), Some("0.25"));
        assert_eq!(res.header("etag"), Some("\"abc\""));
        let count = res.headers().iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("x-process-time"))
            .count();
        assert_eq!(count, 1);
        assert_eq!(res.headers().len(), 3);
    }

    #[test]
    fn into_http_carries_status_headers_and_body() {
        let mut res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/items/1")
            .json(b"{}".to_vec());
        res.set_header("bad header", "dropped");
        let res = res.into_http();

        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["content-type"], "application/json");
        assert_eq!(res.headers()["location"], "/items/1");
        assert_eq!(res.headers().len(), 2);
    }

    #[test]
    fn result_errors_become_handler_errors() {
        let ok: Result<&'static str, std::io::Error> = Ok("fine");
        assert_eq!(ok.into_result().unwrap().body(), b"fine");

        let err: Result<&'static str, std::io::Error> =
            Err(std::io::Error::other("disk on fire"));
        let err = err.into_result().unwrap_err();
        assert_eq!(
            err.downcast_ref::<std::io::Error>().map(ToString::to_string).as_deref(),
            Some("disk on fire"),
        );
    }
}
