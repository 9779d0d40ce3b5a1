//! Custom handler registry.
//!
//! Maps exact `(path, method)` pairs to application callbacks. Append-only:
//! there is no update or remove, and entries live as long as the registry.
//!
//! Reads never lock. The table is an immutable snapshot held in an
//! [`ArcSwap`]; a registration builds a new snapshot under the writer lock
//! and swaps it in. Every request, including the many that match nothing,
//! costs one atomic load.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use matchit::Router as MatchitRouter;
use tracing::{info, warn};

use crate::config::BoundedString;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// Maximum stored path length in bytes. Longer paths are truncated.
pub const PATH_MAX: usize = 63;

/// A registered path, truncated to [`PATH_MAX`] bytes.
pub type HandlerPath = BoundedString<PATH_MAX>;

struct Entry {
    path: HandlerPath,
    method: Method,
    handler: BoxedHandler,
}

/// One immutable generation of the registry.
///
/// One exact-match tree per method, rebuilt from `entries` on every
/// registration. Entries are kept newest first.
#[derive(Default)]
struct RouteTable {
    trees: HashMap<Method, MatchitRouter<BoxedHandler>>,
    entries: Vec<Arc<Entry>>,
}

impl RouteTable {
    fn contains(&self, method: Method, path: &str) -> bool {
        self.entries.iter().any(|e| e.method == method && e.path.as_str() == path)
    }

    /// Builds the next generation with `entry` added at the head.
    fn with(&self, entry: Entry) -> Result<Self, Error> {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.push(Arc::new(entry));
        entries.extend(self.entries.iter().cloned());

        let mut trees: HashMap<Method, MatchitRouter<BoxedHandler>> = HashMap::new();
        for e in &entries {
            trees
                .entry(e.method)
                .or_default()
                .insert(escape(&e.path), Arc::clone(&e.handler))
                .map_err(|err| match err {
                    matchit::InsertError::Conflict { .. } => Error::AlreadyExists {
                        method: e.method,
                        path: e.path.to_string(),
                    },
                    _ => Error::InvalidArgument("path"),
                })?;
        }

        Ok(Self { trees, entries })
    }

    fn lookup(&self, method: Method, path: &str) -> Option<BoxedHandler> {
        let tree = self.trees.get(&method)?;
        let matched = tree.at(path).ok()?;
        Some(Arc::clone(matched.value))
    }
}

/// Registered paths are literal. Braces are matchit's parameter syntax, so
/// they are doubled to match themselves.
fn escape(path: &str) -> String {
    path.replace('{', "{{").replace('}', "}}")
}

/// The custom handler registry.
pub struct HandlerRegistry {
    table: ArcSwap<RouteTable>,
    writer: Mutex<()>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::default()),
            writer: Mutex::new(()),
        }
    }

    /// Registers `handler` for requests whose path equals `path` exactly and
    /// whose method is `method`.
    ///
    /// `path` is truncated to [`PATH_MAX`] bytes before it is stored or
    /// compared.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `path` is empty.
    /// - [`Error::AlreadyExists`] if the pair is already registered. The
    ///   registry is unchanged.
    pub fn register(&self, path: &str, method: Method, handler: impl Handler) -> Result<(), Error> {
        if path.is_empty() {
            return Err(Error::InvalidArgument("path"));
        }
        let path = HandlerPath::new(path);

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.table.load();

        if current.contains(method, &path) {
            warn!(%method, %path, "handler already registered");
            return Err(Error::AlreadyExists { method, path: path.to_string() });
        }

        let next = current.with(Entry {
            path: path.clone(),
            method,
            handler: handler.into_boxed_handler(),
        })?;
        self.table.store(Arc::new(next));

        info!(%method, %path, "custom handler registered");
        Ok(())
    }

    /// Exact-match lookup. Lock-free.
    pub(crate) fn lookup(&self, method: Method, path: &str) -> Option<BoxedHandler> {
        self.table.load().lookup(method, path)
    }

    /// Number of registered `(path, method)` pairs.
    pub fn len(&self) -> usize {
        self.table.load().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::response::Response;

    async fn ok(_req: Request) -> Response {
        Response::text("ok")
    }

    async fn other(_req: Request) -> Response {
        Response::text("other")
    }

    fn get(path: &str) -> Request {
        Request::new(Method::Get, path, Vec::new(), Vec::new())
    }

    #[test]
    fn register_grows_by_one() {
        let registry = HandlerRegistry::new();

        registry.register("/api/status", Method::Get, ok).unwrap();
        assert_eq!(registry.len(), 1);

        registry.register("/api/config", Method::Post, ok).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_pair_is_rejected_and_registry_unchanged() {
        let registry = HandlerRegistry::new();
        registry.register("/api/status", Method::Get, ok).unwrap();

        let err = registry.register("/api/status", Method::Get, other).unwrap_err();

        assert!(matches!(err, Error::AlreadyExists { method: Method::Get, .. }));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_keeps_first_handler() {
        let registry = HandlerRegistry::new();
        registry.register("/api/status", Method::Get, ok).unwrap();
        let _ = registry.register("/api/status", Method::Get, other);

        let handler = registry.lookup(Method::Get, "/api/status").unwrap();
        let body = handler.call(get("/api/status")).await.into_bytes().await;

        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn handler_outlives_later_registrations() {
        let registry = HandlerRegistry::new();
        registry.register("/api/status", Method::Get, ok).unwrap();
        let held = registry.lookup(Method::Get, "/api/status").unwrap();

        for i in 0..8 {
            registry.register(&format!("/api/extra/{i}"), Method::Post, other).unwrap();
        }

        let current = registry.lookup(Method::Get, "/api/status").unwrap();
        assert!(Arc::ptr_eq(&held, &current));
        assert_eq!(&held.call(get("/api/status")).await.into_bytes().await[..], b"ok");
    }

    #[test]
    fn same_path_different_method_is_distinct() {
        let registry = HandlerRegistry::new();

        registry.register("/api/config", Method::Get, ok).unwrap();
        registry.register("/api/config", Method::Post, ok).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup(Method::Put, "/api/config").is_none());
    }

    #[test]
    fn empty_path_is_invalid() {
        let registry = HandlerRegistry::new();

        let err = registry.register("", Method::Get, ok).unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn lookup_is_exact() {
        let registry = HandlerRegistry::new();
        registry.register("/api/status", Method::Get, ok).unwrap();

        assert!(registry.lookup(Method::Get, "/api/status").is_some());
        assert!(registry.lookup(Method::Get, "/api/status/").is_none());
        assert!(registry.lookup(Method::Get, "/api").is_none());
    }

    #[test]
    fn braces_are_literal() {
        let registry = HandlerRegistry::new();
        registry.register("/users/{id}", Method::Get, ok).unwrap();

        assert!(registry.lookup(Method::Get, "/users/{id}").is_some());
        assert!(registry.lookup(Method::Get, "/users/42").is_none());
    }

    #[test]
    fn long_paths_are_truncated() {
        let registry = HandlerRegistry::new();
        let long = format!("/{}", "a".repeat(100));
        registry.register(&long, Method::Get, ok).unwrap();

        let stored = &long[..PATH_MAX];
        assert!(registry.lookup(Method::Get, stored).is_some());
        assert!(registry.lookup(Method::Get, &long).is_none());

        // A different path sharing the truncated prefix collides.
        let sibling = format!("{stored}zzz");
        assert!(registry.register(&sibling, Method::Get, ok).is_err());
    }
}
