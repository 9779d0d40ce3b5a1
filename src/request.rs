//! Incoming HTTP request type.

use crate::method::Method;

/// An incoming HTTP request with its body already collected.
///
/// The request target is kept whole. [`path`](Self::path) is the part before
/// `?` and [`query`](Self::query) the part after it.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) target: String,
    pub(crate) path_len: usize,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
}

impl Request {
    /// `target` is an origin-form request target, with or without a query.
    pub fn new(
        method: Method,
        target: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        let target = target.into();
        let path_len = target.find('?').unwrap_or(target.len());
        Self { method, target, path_len, headers, body }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.target[..self.path_len] }
    /// Path and query as the client sent them.
    pub fn target(&self) -> &str { &self.target }
    pub fn query(&self) -> Option<&str> { self.target.get(self.path_len + 1..) }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `User-Agent` header, or `""` when absent.
    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }
}
