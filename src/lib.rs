//! # snare
//!
//! A captive portal for a wireless access point. Two pieces do the work:
//!
//! - **DNS hijack**: every query on UDP/53 gets a forged A record pointing at
//!   the portal. No resolution, no forwarding.
//! - **HTTP router**: every request on every path lands on one router that
//!   serves portal assets, runs the application's own handlers, and answers
//!   OS connectivity probes so phones and laptops pop their "sign in to
//!   network" sheet.
//!
//! Routing order, first match wins:
//!
//! 1. `/`, `/index.html`, `/styles.css`, `/script.js` → static files
//! 2. exact `(path, method)` custom handler → that handler
//! 3. path or query contains a probe keyword (`generate_204`, `hotspot`,
//!    `ncsi`, …) → OS-specific probe answer
//! 4. anything else → static files, `404` on a miss
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use snare::{Config, Method, Portal, Request, Response};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snare::Error> {
//!     let mut portal = Portal::new(Config {
//!         root: "/var/www/portal".into(),
//!         ..Config::default()
//!     });
//!
//!     portal.register("/api/status", Method::Get, status)?;
//!     portal.register("/api/config", Method::Post, save_config)?;
//!     portal.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     portal.destroy().await;
//!     Ok(())
//! }
//!
//! async fn status(_req: Request) -> Response {
//!     Response::json(br#"{"status":"ok","portal":"working"}"#.to_vec())
//! }
//!
//! async fn save_config(req: Request) -> Response {
//!     tracing::info!(bytes = req.body().len(), "config received");
//!     Response::json(br#"{"result":"success"}"#.to_vec())
//! }
//! ```

mod config;
mod error;
mod files;
mod handler;
mod method;
mod netif;
mod portal;
mod registry;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod detect;
pub mod dns;

pub use config::{AccessPointConfig, BoundedString, Config, PASSWORD_MAX, ROOT_MAX, SSID_MAX};
pub use error::Error;
pub use files::{CHUNK_SIZE, StaticFiles, join as join_path, mime_type};
pub use handler::Handler;
pub use method::Method;
pub use netif::{NetworkInterface, Unmanaged};
pub use portal::Portal;
pub use registry::{HandlerPath, HandlerRegistry, PATH_MAX};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{Router, WELL_KNOWN_PATHS};
pub use server::{BIND_ATTEMPTS, BIND_BACKOFF};
pub use status::Status;
