//! Desired state
//!
//! Turns the fetched peer list into the (domain, address) pairs the zone
//! should contain. Pure: no I/O.

use crate::error::{Error, Result};
use crate::traits::Peer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// The record a peer implies should exist in the zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRecord {
    pub domain: String,
    pub address: String,
}

impl DesiredRecord {
    pub fn new(domain: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for DesiredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.domain, self.address)
    }
}

/// Whether `domain` sits strictly below `zone_domain`
///
/// The zone apex itself and look-alike suffixes (`badexample.com` for zone
/// `example.com`) do not belong to the zone.
pub fn belongs_to_zone(domain: &str, zone_domain: &str) -> bool {
    domain
        .strip_suffix(zone_domain)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Build the desired record set for a run
///
/// Output order follows `peers`. The whole list is validated before anything
/// is returned, so a single foreign domain or unusable address yields an
/// error and no records. Addresses come out in canonical dotted-quad form.
///
/// # Errors
///
/// - [`Error::Validation`] naming the first peer domain outside `zone_domain`
/// - [`Error::InvalidAddress`] for the first peer whose address is not IPv4
pub fn build_desired_state(peers: &[Peer], zone_domain: &str) -> Result<Vec<DesiredRecord>> {
    peers
        .iter()
        .map(|peer| {
            if !belongs_to_zone(&peer.dns_label, zone_domain) {
                return Err(Error::validation(&peer.dns_label, zone_domain));
            }
            let address: Ipv4Addr = peer
                .ip
                .trim()
                .parse()
                .map_err(|_| Error::invalid_address(&peer.dns_label, &peer.ip))?;
            Ok(DesiredRecord::new(&peer.dns_label, address.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_pairs_in_input_order() {
        let peers = vec![
            Peer::new("b.example.com", "100.64.0.2"),
            Peer::new("a.example.com", "100.64.0.1"),
            Peer::new("deep.nested.example.com", "100.64.0.3"),
        ];

        let desired = build_desired_state(&peers, "example.com").unwrap();
        assert_eq!(
            desired,
            vec![
                DesiredRecord::new("b.example.com", "100.64.0.2"),
                DesiredRecord::new("a.example.com", "100.64.0.1"),
                DesiredRecord::new("deep.nested.example.com", "100.64.0.3"),
            ]
        );
    }

    #[test]
    fn foreign_domain_fails_validation() {
        let peers = vec![
            Peer::new("a.example.com", "100.64.0.1"),
            Peer::new("d.other.com", "100.64.0.4"),
        ];

        let err = build_desired_state(&peers, "example.com").unwrap_err();
        match err {
            Error::Validation { domain, zone } => {
                assert_eq!(domain, "d.other.com");
                assert_eq!(zone, "example.com");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn non_ipv4_address_fails_validation() {
        for bad in ["not-an-ip", "fd00::1", "", "100.64.0.256"] {
            let peers = vec![
                Peer::new("a.example.com", "100.64.0.1"),
                Peer::new("b.example.com", bad),
            ];

            let err = build_desired_state(&peers, "example.com").unwrap_err();
            assert!(err.is_validation(), "{:?} should be rejected", bad);
            match err {
                Error::InvalidAddress { domain, address } => {
                    assert_eq!(domain, "b.example.com");
                    assert_eq!(address, bad);
                }
                other => panic!("expected invalid address error, got {:?}", other),
            }
        }
    }

    #[test]
    fn address_is_trimmed() {
        let peers = vec![Peer::new("a.example.com", " 100.64.0.1\n")];
        let desired = build_desired_state(&peers, "example.com").unwrap();
        assert_eq!(desired[0].address, "100.64.0.1");
    }

    #[test]
    fn apex_and_lookalike_suffix_do_not_belong() {
        assert!(belongs_to_zone("d.example.com", "example.com"));
        assert!(!belongs_to_zone("example.com", "example.com"));
        assert!(!belongs_to_zone("badexample.com", "example.com"));
        assert!(!belongs_to_zone("d.example.com.evil", "example.com"));
    }

    #[test]
    fn empty_peer_list_is_empty_desired_state() {
        assert!(build_desired_state(&[], "example.com").unwrap().is_empty());
    }
}
