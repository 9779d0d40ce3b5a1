//! Portal lifecycle.
//!
//! A [`Portal`] owns its configuration, the custom handler registry, and,
//! while running, the HTTP listener task and the DNS hijack task.
//!
//! ```text
//!  new ──▶ stopped ──start──▶ running ──stop──▶ stopped ──destroy
//!             ▲  register()     │  register()
//!             └─────────────────┘
//! ```
//!
//! `stop` signals both tasks and waits for them to finish before it tears
//! the network interface down. Dropping a running portal signals and
//! aborts the tasks without waiting; prefer [`Portal::destroy`].

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dns::DnsHijack;
use crate::error::Error;
use crate::files::StaticFiles;
use crate::handler::Handler;
use crate::method::Method;
use crate::netif::{NetworkInterface, Unmanaged};
use crate::registry::HandlerRegistry;
use crate::router::Router;
use crate::server;

/// Tasks and addresses that exist only while the portal runs.
struct Running {
    shutdown: watch::Sender<bool>,
    http: JoinHandle<()>,
    http_addr: SocketAddr,
    dns: Option<(JoinHandle<()>, SocketAddr)>,
    portal_url: String,
}

/// A captive portal instance.
///
/// ```rust,no_run
/// use snare::{Config, Method, Portal, Request, Response};
///
/// # async fn run() -> Result<(), snare::Error> {
/// let mut portal = Portal::new(Config::default());
/// portal.register("/api/status", Method::Get, status)?;
/// portal.start().await?;
/// // ...
/// portal.destroy().await;
/// # Ok(())
/// # }
///
/// async fn status(_req: Request) -> Response {
///     Response::json(br#"{"status":"ok"}"#.to_vec())
/// }
/// ```
pub struct Portal {
    config: Config,
    registry: Arc<HandlerRegistry>,
    interface: Box<dyn NetworkInterface>,
    running: AtomicBool,
    state: Option<Running>,
}

impl Portal {
    /// Creates a stopped portal on an externally managed interface.
    pub fn new(config: Config) -> Self {
        Self::with_interface(config, Unmanaged)
    }

    /// Creates a stopped portal from `config`, or from the defaults if `None`.
    pub fn init(config: Option<Config>) -> Self {
        Self::new(config.unwrap_or_default())
    }

    /// Creates a stopped portal that brings `interface` up on start and
    /// down on stop.
    pub fn with_interface(config: Config, interface: impl NetworkInterface) -> Self {
        info!(ssid = %config.access_point.ssid, "captive portal initialized");
        Self {
            config,
            registry: Arc::new(HandlerRegistry::new()),
            interface: Box::new(interface),
            running: AtomicBool::new(false),
            state: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a custom handler. Allowed before and while running.
    ///
    /// See [`HandlerRegistry::register`] for the matching rules and errors.
    pub fn register(&self, path: &str, method: Method, handler: impl Handler) -> Result<(), Error> {
        self.registry.register(path, method, handler)
    }

    /// Number of registered custom handlers.
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Address the HTTP listener is bound to, while running.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.state.as_ref().map(|s| s.http_addr)
    }

    /// Address the DNS responder is bound to, while running. `None` if the
    /// DNS socket could not be bound; HTTP keeps serving regardless.
    pub fn dns_addr(&self) -> Option<SocketAddr> {
        self.state.as_ref().and_then(|s| s.dns.as_ref().map(|(_, addr)| *addr))
    }

    /// Redirect target handed to connectivity probes, while running.
    pub fn portal_url(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.portal_url.as_str())
    }

    /// Brings the interface up, binds the HTTP listener, then starts the
    /// DNS responder.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyRunning`] if started twice.
    /// - [`Error::Interface`] if the access point cannot be brought up.
    /// - [`Error::BindExhausted`] if the HTTP port stays unavailable. The
    ///   interface is torn down again.
    pub async fn start(&mut self) -> Result<(), Error> {
        if self.state.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let gateway = self.config.gateway;
        self.interface
            .bring_up(&self.config.access_point, gateway)
            .map_err(Error::Interface)?;

        let bound = server::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.http_port)))
            .await
            .and_then(|l| Ok((l.local_addr()?, l)));
        let (http_addr, listener) = match bound {
            Ok(v) => v,
            Err(e) => {
                self.interface.tear_down();
                return Err(e);
            }
        };

        let (shutdown, _) = watch::channel(false);
        let portal_url = self.config.portal_url_on(http_addr.port());
        let router = Router::new(
            Arc::clone(&self.registry),
            StaticFiles::new(self.config.root.as_str()),
            portal_url.clone(),
        );
        let http = server::spawn(
            listener,
            Arc::new(router),
            self.config.max_connections,
            self.config.max_body,
            shutdown.subscribe(),
        );

        let dns_bind = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.dns_port));
        let dns = match DnsHijack::bind(dns_bind, gateway).await {
            Ok(dns) => match dns.local_addr() {
                Ok(addr) => Some((dns.spawn(shutdown.subscribe()), addr)),
                Err(e) => {
                    error!("DNS hijack unavailable: {e}");
                    None
                }
            },
            Err(e) => {
                error!(addr = %dns_bind, "failed to bind DNS socket: {e}");
                None
            }
        };

        self.state = Some(Running { shutdown, http, http_addr, dns, portal_url });
        self.running.store(true, Ordering::Release);

        info!(
            ssid = %self.config.access_point.ssid,
            %gateway,
            http = %http_addr,
            root = %self.config.root,
            "captive portal started"
        );
        Ok(())
    }

    /// Signals both tasks, waits for them to exit, then tears the network
    /// interface down.
    ///
    /// # Errors
    ///
    /// [`Error::NotRunning`] if the portal is not running.
    pub async fn stop(&mut self) -> Result<(), Error> {
        let Some(state) = self.state.take() else {
            return Err(Error::NotRunning);
        };

        // Both receivers may already be gone if their tasks died; nothing to signal then.
        let _ = state.shutdown.send(true);

        if let Some((dns, _)) = state.dns {
            if let Err(e) = dns.await {
                warn!("DNS hijack task failed: {e}");
            }
        }
        if let Err(e) = state.http.await {
            warn!("HTTP listener task failed: {e}");
        }

        self.interface.tear_down();
        self.running.store(false, Ordering::Release);

        info!("captive portal stopped");
        Ok(())
    }

    /// Stops the portal if it is running and releases it, registered
    /// handlers included.
    pub async fn destroy(mut self) {
        if self.state.is_some() {
            let _ = self.stop().await;
        }
        info!(handlers = self.registry.len(), "captive portal destroyed");
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            warn!("captive portal dropped while running; aborting tasks");
            let _ = state.shutdown.send(true);
            state.http.abort();
            if let Some((dns, _)) = state.dns {
                dns.abort();
            }
            self.interface.tear_down();
            self.running.store(false, Ordering::Release);
        }
    }
}
