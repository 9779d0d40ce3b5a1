//! Request router.
//!
//! Every request, whatever its method, goes through the same four steps and
//! stops at the first that applies:
//!
//! 1. Well-known asset paths go straight to the static file responder.
//! 2. An exact `(path, method)` match in the custom handler registry gets
//!    the request. Its response is returned untouched.
//! 3. A request target containing a connectivity-probe keyword goes to the
//!    detection responder. The query string counts, so `/login?redirect=...`
//!    is caught too.
//! 4. Everything else is tried as a static file; a miss is `404`.
//!
//! Steps 1, 2 and 4 look at the path only.

use std::sync::Arc;

use tracing::debug;

use crate::detect;
use crate::files::StaticFiles;
use crate::registry::HandlerRegistry;
use crate::request::Request;
use crate::response::Response;

/// Paths that are always static assets, ahead of custom handlers and probes.
pub const WELL_KNOWN_PATHS: &[&str] = &["/", "/index.html", "/styles.css", "/script.js"];

/// The portal's request router. Stateless per request; cheap to share.
pub struct Router {
    registry: Arc<HandlerRegistry>,
    files: StaticFiles,
    portal_url: String,
}

impl Router {
    pub fn new(registry: Arc<HandlerRegistry>, files: StaticFiles, portal_url: impl Into<String>) -> Self {
        Self { registry, files, portal_url: portal_url.into() }
    }

    pub async fn route(&self, req: Request) -> Response {
        let path = req.path();
        debug!(method = %req.method(), path, "routing");

        if WELL_KNOWN_PATHS.contains(&path) {
            return self.files.respond(path).await;
        }

        if let Some(handler) = self.registry.lookup(req.method(), path) {
            debug!(path, "custom handler");
            return handler.call(req).await;
        }

        let target = req.target();
        if detect::is_probe(target) {
            return detect::respond(target, req.user_agent(), &self.portal_url);
        }

        self.files.respond(path).await
    }
}
