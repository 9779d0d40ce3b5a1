//! DNS hijack responder.
//!
//! Answers every query with the portal's own address. There is no resolver
//! behind this: the question is never parsed, its type is never checked, and
//! the forged answer is appended to whatever the client sent. That is the
//! point. Every name a newly joined client looks up lands on the portal.
//!
//! Wire layout of the appended answer record (16 bytes):
//!
//! ```text
//! C0 0C        name: pointer to the question name at offset 12
//! 00 01        type A
//! 00 01        class IN
//! 00 00 00 78  TTL 120 s
//! 00 04        rdlength
//! a b c d      gateway address
//! ```

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Size of a DNS message header.
pub const HEADER_LEN: usize = 12;
/// Largest query accepted (classic UDP DNS limit).
pub const MAX_QUERY_LEN: usize = 512;
/// Size of the forged answer record.
pub const ANSWER_LEN: usize = 16;
/// TTL of the forged answer, in seconds.
pub const ANSWER_TTL: u32 = 120;

/// Upper bound on one receive, so the loop never parks indefinitely.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Turns the query in `buf[..len]` into a response, in place.
///
/// Sets QR and RA (flags `0x8180`), sets ANCOUNT to 1 and appends an A record
/// for `addr` right after the query. Returns the response length, or `None`
/// when the datagram is no longer than a bare header or the answer does not
/// fit in `buf`.
pub fn forge_answer(buf: &mut [u8], len: usize, addr: Ipv4Addr) -> Option<usize> {
    if len <= HEADER_LEN || len + ANSWER_LEN > buf.len() {
        return None;
    }

    buf[2..4].copy_from_slice(&0x8180u16.to_be_bytes());
    buf[6..8].copy_from_slice(&1u16.to_be_bytes());

    let answer = &mut buf[len..len + ANSWER_LEN];
    answer[0..2].copy_from_slice(&0xC00Cu16.to_be_bytes());
    answer[2..4].copy_from_slice(&1u16.to_be_bytes());
    answer[4..6].copy_from_slice(&1u16.to_be_bytes());
    answer[6..10].copy_from_slice(&ANSWER_TTL.to_be_bytes());
    answer[10..12].copy_from_slice(&4u16.to_be_bytes());
    answer[12..16].copy_from_slice(&addr.octets());

    Some(len + ANSWER_LEN)
}

/// A bound DNS socket, ready to be spawned as the hijack task.
pub(crate) struct DnsHijack {
    socket: UdpSocket,
    gateway: Ipv4Addr,
}

impl DnsHijack {
    pub(crate) async fn bind(addr: SocketAddr, gateway: Ipv4Addr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket, gateway })
    }

    pub(crate) fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs the responder until `shutdown` fires. The socket is closed when
    /// the returned task completes.
    pub(crate) fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(run(self.socket, self.gateway, shutdown))
    }
}

async fn run(
    socket: UdpSocket,
    gateway: Ipv4Addr,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; MAX_QUERY_LEN + ANSWER_LEN];

    info!(%gateway, "DNS hijack started");

    while !*shutdown.borrow() {
        tokio::select! {
            biased;

            res = shutdown.changed() => {
                if res.is_err() {
                    break;
                }
            }

            res = tokio::time::timeout(RECV_TIMEOUT, socket.recv_from(&mut buf[..MAX_QUERY_LEN])) => {
                let (len, peer) = match res {
                    Err(_elapsed) => continue,
                    Ok(Ok(v)) => v,
                    Ok(Err(e)) => {
                        warn!("DNS recv error: {e}");
                        continue;
                    }
                };

                let Some(out) = forge_answer(&mut buf, len, gateway) else {
                    debug!(%peer, len, "DNS datagram too short");
                    continue;
                };

                info!(%peer, "DNS query");
                if let Err(e) = socket.send_to(&buf[..out], peer).await {
                    warn!(%peer, "DNS send error: {e}");
                }
            }
        }
    }

    drop(socket);
    info!("DNS hijack stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Query for `example.com` A IN, id 0xBEEF, RD set.
    fn query() -> Vec<u8> {
        let mut q = vec![0xBE, 0xEF, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0];
        q.extend_from_slice(b"\x07example\x03com\x00");
        q.extend_from_slice(&[0, 1, 0, 1]);
        q
    }

    #[test]
    fn forges_a_record_for_gateway() {
        let q = query();
        let mut buf = [0u8; MAX_QUERY_LEN + ANSWER_LEN];
        buf[..q.len()].copy_from_slice(&q);

        let out = forge_answer(&mut buf, q.len(), Ipv4Addr::new(192, 168, 4, 1)).unwrap();

        assert_eq!(out, q.len() + ANSWER_LEN);
        assert_eq!(&buf[0..2], &[0xBE, 0xEF]);
        assert_eq!(&buf[2..4], &[0x81, 0x80]);
        assert_eq!(&buf[4..8], &[0, 1, 0, 1]);
        assert_eq!(&buf[12..q.len()], &q[12..]);

        let answer = &buf[q.len()..out];
        assert_eq!(&answer[..12], &[0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0, 0x78, 0, 4]);
        assert_eq!(&answer[12..], &[192, 168, 4, 1]);
    }

    #[test]
    fn answer_ignores_query_name() {
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        a[..13].copy_from_slice(b"\0\x01\0\0\0\x01\0\0\0\0\0\0\x01");
        b[..20].copy_from_slice(b"\0\x02\0\0\0\x01\0\0\0\0\0\0\x03foo\x00\0\x1c\0");

        let addr = Ipv4Addr::new(10, 0, 0, 1);
        let la = forge_answer(&mut a, 13, addr).unwrap();
        let lb = forge_answer(&mut b, 20, addr).unwrap();

        assert_eq!(&a[la - 4..la], &addr.octets());
        assert_eq!(&b[lb - 4..lb], &addr.octets());
    }

    #[test]
    fn header_only_is_ignored() {
        let mut buf = [0u8; 64];

        assert_eq!(forge_answer(&mut buf, HEADER_LEN, Ipv4Addr::LOCALHOST), None);
        assert_eq!(forge_answer(&mut buf, 3, Ipv4Addr::LOCALHOST), None);
    }

    #[test]
    fn no_room_for_answer_is_ignored() {
        let mut buf = [0u8; 20];

        assert_eq!(forge_answer(&mut buf, 13, Ipv4Addr::LOCALHOST), None);
    }

    #[tokio::test]
    async fn task_answers_and_stops() {
        let (tx, rx) = watch::channel(false);
        let dns = DnsHijack::bind("127.0.0.1:0".parse().unwrap(), Ipv4Addr::new(192, 168, 4, 1))
            .await
            .unwrap();
        let addr = dns.local_addr().unwrap();
        let task = dns.spawn(rx);

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let q = query();
        client.send_to(&q, addr).await.unwrap();
        let mut buf = [0u8; 600];
        let (n, _) = tokio::time::timeout(Duration::from_secs(5), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(n, q.len() + ANSWER_LEN);
        assert_eq!(&buf[n - 4..n], &[192, 168, 4, 1]);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
