//! Post-mutation propagation check
//!
//! Consumes engine events. After a record is created or updated, asks the
//! configured resolver for the domain's A records and logs whether the new
//! address is visible yet. Purely observational: the record store listing
//! stays the source of truth and a failed check never fails a run.

use nbsync_core::{CancellationToken, SyncEvent};
use rsdns::clients::ClientConfig;
use rsdns::clients::tokio::Client;
use rsdns::records::Class;
use rsdns::records::data::A;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct Watcher {
    resolver: SocketAddr,
    enabled: bool,
}

impl Watcher {
    pub fn new(resolver: SocketAddr, enabled: bool) -> Self {
        Self { resolver, enabled }
    }

    /// Drain engine events until the channel closes or `cancel` fires
    pub async fn run(self, mut events: mpsc::Receiver<SyncEvent>, cancel: CancellationToken) {
        if self.enabled {
            info!("Checking propagation of changed records via {}", self.resolver);
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            debug!(?event, "Engine event");

            let Some((domain, address)) = changed_record(&event) else {
                continue;
            };
            if !self.enabled {
                continue;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.check(domain, address) => {}
            }
        }
    }

    async fn check(&self, domain: &str, address: &str) {
        let Ok(expected) = address.parse::<Ipv4Addr>() else {
            debug!("Skipping propagation check for {}: {} is not an IPv4 address", domain, address);
            return;
        };

        match lookup_a(self.resolver, domain).await {
            Ok(addresses) if addresses.contains(&expected) => {
                info!("{} resolves to {} via {}", domain, expected, self.resolver);
            }
            Ok(addresses) => {
                warn!(
                    "{} not yet visible via {}: got {:?}, expected {}",
                    domain, self.resolver, addresses, expected
                );
            }
            Err(e) => {
                warn!("Propagation check for {} via {} failed: {}", domain, self.resolver, e);
            }
        }
    }
}

/// Domain and new address of a created or updated record
fn changed_record(event: &SyncEvent) -> Option<(&str, &str)> {
    match event {
        SyncEvent::RecordCreated { domain, address, .. }
        | SyncEvent::RecordUpdated { domain, address, .. } => Some((domain.as_str(), address.as_str())),
        _ => None,
    }
}

async fn lookup_a(resolver: SocketAddr, qname: &str) -> rsdns::Result<Vec<Ipv4Addr>> {
    let config = ClientConfig::with_nameserver(resolver);
    let mut client = Client::new(config).await?;
    let rrset = client.query_rrset::<A>(qname, Class::IN).await?;
    Ok(rrset.rdata.iter().map(|a| a.address).collect())
}
