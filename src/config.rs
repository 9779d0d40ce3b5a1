//! Portal configuration.
//!
//! All string fields are [`BoundedString`]s: anything longer than the bound is
//! cut, never rejected. A portal copies its `Config` at construction and never
//! mutates it afterwards.

use std::fmt;
use std::net::Ipv4Addr;
use std::ops::Deref;

/// Maximum SSID length in bytes (802.11 limit).
pub const SSID_MAX: usize = 31;
/// Maximum WPA pre-shared key length in bytes.
pub const PASSWORD_MAX: usize = 63;
/// Maximum file-root length in bytes.
pub const ROOT_MAX: usize = 255;

// ── BoundedString ─────────────────────────────────────────────────────────────

/// A string of at most `N` bytes.
///
/// Construction truncates silently to the longest prefix that fits in `N`
/// bytes and ends on a UTF-8 character boundary:
///
/// ```rust
/// use snare::BoundedString;
///
/// let s = BoundedString::<4>::new("abcdef");
/// assert_eq!(s.as_str(), "abcd");
///
/// // "é" is two bytes; it does not fit after "abc" and is dropped whole.
/// let s = BoundedString::<4>::new("abcé");
/// assert_eq!(s.as_str(), "abc");
/// ```
#[derive(Clone, Default, Eq, Hash, PartialEq)]
pub struct BoundedString<const N: usize>(String);

impl<const N: usize> BoundedString<N> {
    pub fn new(s: &str) -> Self {
        let mut end = s.len().min(N);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        Self(s[..end].to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> Deref for BoundedString<N> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> From<&str> for BoundedString<N> {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<const N: usize> From<String> for BoundedString<N> {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl<const N: usize> fmt::Display for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: usize> fmt::Debug for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

// ── Access point ──────────────────────────────────────────────────────────────

/// Identity of the wireless access point the portal sits behind.
#[derive(Clone, Debug)]
pub struct AccessPointConfig {
    pub ssid: BoundedString<SSID_MAX>,
    /// `None` (or empty) means an open network; otherwise WPA/WPA2-PSK.
    pub password: Option<BoundedString<PASSWORD_MAX>>,
    pub channel: u8,
    pub hidden: bool,
    /// Maximum associated stations.
    pub max_clients: u8,
}

impl AccessPointConfig {
    /// Whether the network is open (no usable pre-shared key).
    pub fn is_open(&self) -> bool {
        self.password.as_ref().is_none_or(|p| p.is_empty())
    }
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        Self {
            ssid: BoundedString::new("ESP32-Captive-Portal"),
            password: None,
            channel: 1,
            hidden: false,
            max_clients: 4,
        }
    }
}

// ── Config ────────────────────────────────────────────────────────────────────

/// Everything a [`Portal`](crate::Portal) needs to run.
///
/// ```rust
/// use snare::Config;
///
/// let config = Config {
///     http_port: 8080,
///     root: "/srv/portal".into(),
///     ..Config::default()
/// };
/// assert_eq!(config.portal_url(), "http://192.168.4.1:8080/");
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    pub access_point: AccessPointConfig,
    pub http_port: u16,
    /// Directory static assets are served from.
    pub root: BoundedString<ROOT_MAX>,
    /// The portal's own address. Every forged DNS answer points here.
    pub gateway: Ipv4Addr,
    pub dns_port: u16,
    /// Size of the HTTP worker pool (concurrently served connections).
    pub max_connections: usize,
    /// Largest request body accepted, in bytes. Larger bodies get `413`.
    pub max_body: usize,
}

impl Config {
    /// Absolute URL of the portal root, used as the redirect target for
    /// connectivity probes. The port is omitted when it is 80.
    pub fn portal_url(&self) -> String {
        self.portal_url_on(self.http_port)
    }

    /// [`portal_url`](Self::portal_url) for a listener actually bound to `port`.
    pub(crate) fn portal_url_on(&self, port: u16) -> String {
        match port {
            80 => format!("http://{}/", self.gateway),
            port => format!("http://{}:{port}/", self.gateway),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_point: AccessPointConfig::default(),
            http_port: 80,
            root: BoundedString::new("/spiffs"),
            gateway: Ipv4Addr::new(192, 168, 4, 1),
            dns_port: 53,
            max_connections: 7,
            max_body: 16 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_string_keeps_short_input() {
        let s = BoundedString::<8>::new("portal");

        assert_eq!(s.as_str(), "portal");
    }

    #[test]
    fn bounded_string_truncates_long_input() {
        let long = "x".repeat(100);
        let s = BoundedString::<SSID_MAX>::new(&long);

        assert_eq!(s.len(), SSID_MAX);
    }

    #[test]
    fn bounded_string_truncates_on_char_boundary() {
        let s = BoundedString::<5>::new("aaaa\u{00e9}");

        assert_eq!(s.as_str(), "aaaa");
    }

    #[test]
    fn defaults_match_stock_portal() {
        let config = Config::default();

        assert_eq!(config.access_point.ssid.as_str(), "ESP32-Captive-Portal");
        assert!(config.access_point.is_open());
        assert_eq!(config.access_point.channel, 1);
        assert_eq!(config.http_port, 80);
        assert_eq!(config.root.as_str(), "/spiffs");
        assert_eq!(config.portal_url(), "http://192.168.4.1/");
        assert_eq!(config.max_body, 16 * 1024);
    }

    #[test]
    fn empty_password_is_open() {
        let ap = AccessPointConfig { password: Some("".into()), ..Default::default() };

        assert!(ap.is_open());
    }

    #[test]
    fn password_makes_network_protected() {
        let ap = AccessPointConfig { password: Some("12345678".into()), ..Default::default() };

        assert!(!ap.is_open());
    }
}
