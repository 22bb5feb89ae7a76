//! Incoming HTTP request type.

use std::collections::HashMap;

use http::Method;

/// An incoming HTTP request.
///
/// The server builds one per request from the hyper request head and the
/// fully collected body. Outside the server, use [`Request::builder`].
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    /// Starts a request for `method` and `uri` (path plus optional `?query`).
    ///
    /// ```rust
    /// use lapse::{Method, Request};
    ///
    /// let req = Request::builder(Method::GET, "/items/5?q=somequery")
    ///     .header("accept", "application/json")
    ///     .build();
    /// assert_eq!(req.path(), "/items/5");
    /// assert_eq!(req.query("q").as_deref(), Some("somequery"));
    /// ```
    pub fn builder(method: Method, uri: &str) -> RequestBuilder {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (uri, None),
        };
        RequestBuilder {
            req: Self {
                method,
                path: path.to_owned(),
                query,
                headers: Vec::new(),
                body: Vec::new(),
                params: HashMap::new(),
            },
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The raw query string, without the leading `?`.
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/items/{item_id}`, `req.param("item_id")` on `/items/42`
    /// returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the first decoded value of a query parameter.
    ///
    /// A malformed query string yields `None` for every key.
    pub fn query(&self, key: &str) -> Option<String> {
        let raw = self.query.as_deref()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
            .ok()?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Fluent builder for [`Request`]. Obtain via [`Request::builder`].
pub struct RequestBuilder {
    req: Request,
}

impl RequestBuilder {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.req.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.req.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        self.req
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_path_and_query() {
        let req = Request::builder(Method::GET, "/items/7?q=a%20b&q=second&flag").build();
        assert_eq!(req.path(), "/items/7");
        assert_eq!(req.query_string(), Some("q=a%20b&q=second&flag"));
        assert_eq!(req.query("q").as_deref(), Some("a b"));
        assert_eq!(req.query("flag").as_deref(), Some(""));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn no_query_means_no_values() {
        let req = Request::builder(Method::GET, "/").build();
        assert_eq!(req.query_string(), None);
        assert_eq!(req.query("q"), None);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::builder(Method::POST, "/users")
            .header("Content-Type", "application/json")
            .body(&b"{}"[..])
            .build();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body(), b"{}");
        assert_eq!(req.method(), Method::POST);
    }
}
