//! Access-point bring-up seam.
//!
//! Radio and interface setup are platform business. The portal only needs
//! to ask for the access point to come up with its configuration before
//! serving, and to go away after it stops serving. Implement
//! [`NetworkInterface`] for the platform; [`Unmanaged`] is for hosts where the
//! interface is configured outside the process.

use std::io;
use std::net::Ipv4Addr;

use tracing::info;

use crate::config::AccessPointConfig;

pub trait NetworkInterface: Send + Sync + 'static {
    /// Brings the access point up with `gateway` as its own address (and
    /// the DNS server it hands out over DHCP).
    fn bring_up(&self, ap: &AccessPointConfig, gateway: Ipv4Addr) -> io::Result<()>;

    /// Tears the access point down. Called once per successful `bring_up`.
    fn tear_down(&self);
}

/// An interface managed outside the process. Logs and succeeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unmanaged;

impl NetworkInterface for Unmanaged {
    fn bring_up(&self, ap: &AccessPointConfig, gateway: Ipv4Addr) -> io::Result<()> {
        info!(
            ssid = %ap.ssid,
            channel = ap.channel,
            hidden = ap.hidden,
            open = ap.is_open(),
            max_clients = ap.max_clients,
            %gateway,
            "access point managed externally"
        );
        Ok(())
    }

    fn tear_down(&self) {}
}
