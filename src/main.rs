use std::net::Ipv4Addr;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use snare::{AccessPointConfig, Config, Portal};

#[derive(Parser)]
#[command(name = "snare")]
#[command(about = "Captive portal: hijacks DNS and answers OS connectivity probes", long_about = None)]
struct Args {
    /// Access point SSID (truncated to 31 bytes)
    #[arg(long, default_value = "ESP32-Captive-Portal")]
    ssid: String,

    /// WPA2 pre-shared key; omit for an open network
    #[arg(long)]
    password: Option<String>,

    /// Wi-Fi channel
    #[arg(long, default_value_t = 1)]
    channel: u8,

    /// Hide the SSID from beacons
    #[arg(long)]
    hidden: bool,

    /// Maximum associated stations
    #[arg(long, default_value_t = 4)]
    max_clients: u8,

    /// HTTP port
    #[arg(short, long, default_value_t = 80)]
    port: u16,

    /// Directory static portal assets are served from
    #[arg(short, long, default_value = "/spiffs")]
    root: String,

    /// Portal address returned for every DNS query
    #[arg(short, long, default_value = "192.168.4.1")]
    gateway: Ipv4Addr,

    /// DNS port
    #[arg(long, default_value_t = 53)]
    dns_port: u16,

    /// Concurrently served HTTP connections
    #[arg(long, default_value_t = 7)]
    workers: usize,

    /// Largest accepted request body, in bytes
    #[arg(long, default_value_t = 16 * 1024)]
    max_body: usize,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            access_point: AccessPointConfig {
                ssid: args.ssid.into(),
                password: args.password.map(Into::into),
                channel: args.channel,
                hidden: args.hidden,
                max_clients: args.max_clients,
            },
            http_port: args.port,
            root: args.root.into(),
            gateway: args.gateway,
            dns_port: args.dns_port,
            max_connections: args.workers,
            max_body: args.max_body,
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut portal = Portal::new(Args::parse().into());

    if let Err(e) = portal.start().await {
        error!("failed to start portal: {e}");
        portal.destroy().await;
        return std::process::ExitCode::FAILURE;
    }

    shutdown_signal().await;
    info!("shutdown signal received");
    portal.destroy().await;
    std::process::ExitCode::SUCCESS
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
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
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
