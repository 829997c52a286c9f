//! Host port resolution.
//!
//! Requested mappings are checked against the host in order. A mapping whose
//! host port is busy, or already claimed earlier in the same pass, is moved to
//! the next free port above it. The container side is never changed.

use std::collections::HashSet;
use std::net::{Ipv4Addr, TcpListener};
use vibecage_runtime::PortMapping;

/// How many ports above a busy one are tried before giving up.
pub const MAX_PORT_ATTEMPTS: u16 = 100;

/// Answers whether a host port can be bound right now.
pub trait PortProbe: Send + Sync {
    /// Whether `port` is free on the host.
    fn is_free(&self, port: u16) -> bool;
}

impl<F> PortProbe for F
where
    F: Fn(u16) -> bool + Send + Sync,
{
    fn is_free(&self, port: u16) -> bool {
        self(port)
    }
}

/// Probes by binding a TCP listener on the loopback interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

impl PortProbe for TcpProbe {
    fn is_free(&self, port: u16) -> bool {
        let free = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok();
        tracing::trace!(port, free, "Probed host port");
        free
    }
}

/// A mapping whose host port was moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortChange {
    /// Host port that was requested.
    pub original_host: u16,
    /// Host port actually used.
    pub resolved_host: u16,
    /// Container port (unchanged).
    pub container: u16,
}

/// Result of a resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortResolution {
    /// Mappings to publish, in request order.
    pub resolved: Vec<PortMapping>,
    /// Mappings whose host port moved, in request order.
    pub changes: Vec<PortChange>,
    /// Requested mappings for which no free port was found.
    pub unresolved: Vec<PortMapping>,
}

impl PortResolution {
    /// Whether every requested mapping got a host port.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Map `requested` onto free host ports.
///
/// Host ports in the result are pairwise distinct. A mapping that cannot be
/// placed within [`MAX_PORT_ATTEMPTS`] ports above its request is reported in
/// [`PortResolution::unresolved`].
pub fn resolve_ports(requested: &[PortMapping], probe: &dyn PortProbe) -> PortResolution {
    let mut claimed = HashSet::with_capacity(requested.len());
    let mut resolution = PortResolution::default();

    for mapping in requested {
        let available = |port: u16, claimed: &HashSet<u16>| {
            !claimed.contains(&port) && probe.is_free(port)
        };

        let host = if available(mapping.host, &claimed) {
            Some(mapping.host)
        } else {
            (1..=MAX_PORT_ATTEMPTS)
                .map_while(|offset| mapping.host.checked_add(offset))
                .find(|&port| available(port, &claimed))
        };

        let Some(host) = host else {
            tracing::warn!(
                host = mapping.host,
                container = mapping.container,
                "No free host port found"
            );
            resolution.unresolved.push(*mapping);
            continue;
        };

        claimed.insert(host);
        resolution
            .resolved
            .push(PortMapping::new(host, mapping.container));

        if host != mapping.host {
            tracing::debug!(
                from = mapping.host,
                to = host,
                container = mapping.container,
                "Remapped host port"
            );
            resolution.changes.push(PortChange {
                original_host: mapping.host,
                resolved_host: host,
                container: mapping.container,
            });
        }
    }

    resolution
}
