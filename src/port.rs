//! Free local port discovery.

use crate::{PrerenderError, Result};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;

/// First port probed when no `startPort` is configured.
pub const DEFAULT_START_PORT: u16 = 5050;

/// Number of consecutive ports probed before giving up.
pub const DEFAULT_PORT_ATTEMPTS: u16 = 100;

/// Finds the first port in `start..start + attempts` that can be bound on
/// localhost. `localhost` may resolve to either loopback address, so a port
/// counts as free only when neither `127.0.0.1` nor `[::1]` is taken. The
/// probe listeners are dropped before returning, so the port is free for the
/// static server to claim.
pub async fn find_available_port(start: u16, attempts: u16) -> Result<u16> {
    for offset in 0..attempts {
        let Some(port) = start.checked_add(offset) else {
            break;
        };
        if port == 0 {
            continue;
        }
        match probe_port(port).await {
            Ok(()) => {
                tracing::debug!(port, "found free port");
                return Ok(port);
            }
            Err(err) => {
                tracing::debug!(port, error = %err, "port busy");
            }
        }
    }

    Err(PrerenderError::NoAvailablePort { start, attempts })
}

async fn probe_port(port: u16) -> std::io::Result<()> {
    let v4 = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await?;
    let v6 = TcpListener::bind(SocketAddr::from((Ipv6Addr::LOCALHOST, port))).await;
    drop(v4);
    match v6 {
        Ok(listener) => {
            drop(listener);
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::AddrInUse => Err(err),
        // Hosts without IPv6 loopback cannot have a listener there.
        Err(err) => {
            tracing::trace!(port, error = %err, "ipv6 loopback unavailable");
            Ok(())
        }
    }
}
