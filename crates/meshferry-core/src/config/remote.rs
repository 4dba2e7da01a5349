//! Editor remote-execution configuration.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Remote-execution transport and timing configuration.
///
/// Defaults match the editor's stock remote-execution settings: multicast
/// group `239.0.0.1:6766` bound on all interfaces with TTL 0, and the command
/// endpoint on `127.0.0.1:6776`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RemoteConfig {
    /// Multicast group editors announce themselves on.
    pub multicast_group: Ipv4Addr,
    /// Multicast group port.
    #[validate(range(min = 1))]
    pub multicast_port: u16,
    /// Local address the multicast socket binds to.
    pub multicast_bind: Ipv4Addr,
    /// Multicast TTL (0 keeps traffic on this host).
    pub multicast_ttl: u32,
    /// Address the command listener binds to and advertises.
    pub command_host: Ipv4Addr,
    /// Port of the command listener (0 picks an ephemeral port).
    pub command_port: u16,
    /// How long to wait for an editor to announce itself.
    #[validate(range(min = 1, max = 600))]
    pub discovery_timeout_seconds: u64,
    /// Interval between discovery polls.
    #[validate(range(min = 10, max = 10_000))]
    pub poll_interval_ms: u64,
    /// Interval between multicast pings.
    #[validate(range(min = 100, max = 60_000))]
    pub ping_interval_ms: u64,
    /// Nodes not heard from for this long are forgotten.
    #[validate(range(min = 1))]
    pub node_timeout_seconds: u64,
    /// How long to wait for the editor to connect back for a command session.
    #[validate(range(min = 1, max = 120))]
    pub connect_timeout_seconds: u64,
    /// Upper bound on waiting for a single command result.
    #[validate(range(min = 1))]
    pub command_timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            multicast_group: Ipv4Addr::new(239, 0, 0, 1),
            multicast_port: 6766,
            multicast_bind: Ipv4Addr::UNSPECIFIED,
            multicast_ttl: 0,
            command_host: Ipv4Addr::LOCALHOST,
            command_port: 6776,
            discovery_timeout_seconds: 10,
            poll_interval_ms: 500,
            ping_interval_ms: 1000,
            node_timeout_seconds: 5,
            connect_timeout_seconds: 5,
            command_timeout_seconds: 600,
        }
    }
}

impl RemoteConfig {
    /// Multicast group endpoint.
    pub fn group_endpoint(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.multicast_group, self.multicast_port))
    }

    /// Local command listener endpoint.
    pub fn command_endpoint(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.command_host, self.command_port))
    }

    /// Discovery window.
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_seconds)
    }

    /// Discovery poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Multicast ping interval.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Node expiry.
    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_seconds)
    }

    /// Connect-back timeout for command sessions.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Command result timeout.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let config = RemoteConfig::default();
        assert_eq!(config.group_endpoint().to_string(), "239.0.0.1:6766");
        assert_eq!(config.command_endpoint().to_string(), "127.0.0.1:6776");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = RemoteConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
