// # Peer Source Trait
//
// Defines the interface for fetching the current member list of the
// overlay network.
//
// ## Implementations
//
// - Netbird management API: `nbsync-peers-netbird` crate
//
// ## Usage
//
// ```rust,ignore
// use nbsync_core::PeerSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* PeerSource implementation */;
//
//     for peer in source.fetch_peers().await? {
//         println!("{} -> {}", peer.dns_label, peer.ip);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A group a peer belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub peers_count: u32,
}

/// A member of the overlay network
///
/// Only `dns_label` and `ip` drive reconciliation. The remaining fields are
/// descriptive metadata; they are defaulted when absent so that additions or
/// removals in the upstream schema do not break parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(default)]
    pub id: String,

    /// Overlay address
    pub ip: String,

    /// Fully qualified DNS name of the peer
    pub dns_label: String,

    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub groups: Vec<PeerGroup>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Peer {
    /// Create a peer carrying only the fields reconciliation needs
    pub fn new(dns_label: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            dns_label: dns_label.into(),
            ip: ip.into(),
            ..Default::default()
        }
    }
}

/// Trait for peer source implementations
///
/// # Contract
///
/// - One remote request per [`PeerSource::fetch_peers`] call
/// - No caching: every run fetches a fresh list
/// - No retry: a failure aborts the run and the next tick retries
#[async_trait]
pub trait PeerSource: Send + Sync {
    /// Fetch the full peer list
    async fn fetch_peers(&self) -> Result<Vec<Peer>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_parses_with_unknown_and_missing_fields() {
        let json = r#"{
            "id": "ch8i4ug6lnn4g9hqv7m0",
            "ip": "100.64.0.10",
            "dns_label": "laptop.netbird.example.com",
            "connected": true,
            "groups": [{"id": "g1", "name": "All", "peers_count": 3, "resources_count": 0}],
            "last_seen": "2024-05-01T10:00:00Z",
            "kernel_version": "6.1.0",
            "ssh_enabled": false
        }"#;

        let peer: Peer = serde_json::from_str(json).unwrap();
        assert_eq!(peer.dns_label, "laptop.netbird.example.com");
        assert_eq!(peer.ip, "100.64.0.10");
        assert!(peer.connected);
        assert_eq!(peer.groups[0].name, "All");
        assert!(peer.last_seen.is_some());
        assert!(peer.hostname.is_empty());
    }

    #[test]
    fn peer_requires_label_and_ip() {
        let json = r#"{"id": "x", "ip": "100.64.0.10"}"#;
        assert!(serde_json::from_str::<Peer>(json).is_err());
    }
}
