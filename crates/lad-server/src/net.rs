//! Local address detection.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::{debug, warn};

/// Address used to reach the public internet, as chosen by the routing table.
///
/// A UDP "connect" sends no packets; it only selects the outbound interface.
/// Falls back to `127.0.0.1` when there is no route (offline, air-gapped).
pub fn outbound_ip() -> IpAddr {
    match detect_outbound_ip() {
        Ok(ip) => {
            debug!(ip = %ip, "Detected outbound IP");
            ip
        }
        Err(e) => {
            warn!(error = %e, "Failed to detect local IP, falling back to 127.0.0.1");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

fn detect_outbound_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(("8.8.8.8", 80))?;
    Ok(socket.local_addr()?.ip())
}

/// `host:port` for a URL, bracketing IPv6 literals.
pub fn url_authority(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]:{port}"),
        _ => format!("{host}:{port}"),
    }
}
