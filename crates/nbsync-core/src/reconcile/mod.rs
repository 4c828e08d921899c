//! Reconciler
//!
//! Converges the record store to the desired state, one domain at a time.
//!
//! ## Per-domain algorithm
//!
//! ```text
//! list A records named exactly <domain>
//!   │
//!   ├─ none ───────────────────────────────► create (proxied = false)
//!   │
//!   └─ some ─┬─ one already has <address> ─► keep it (no-op)
//!            └─ none has it ───────────────► update the first listed,
//!                                            keeping its proxied flag
//!            then delete every other listed record
//! ```
//!
//! After a successful pass exactly one A record with the desired address
//! remains per domain. Running the same pass again issues no mutations.
//!
//! When no existing record matches, "first in list order" is the keeper.
//! The store does not promise a stable list order, so which duplicate
//! survives is a policy choice, not a contract; only the single-record
//! outcome is guaranteed.
//!
//! ## Failure and cancellation
//!
//! Any store call failing aborts the domain and the whole run (fail-fast);
//! mutations already applied stay in place and the next run re-lists
//! everything. The cancellation token is checked before every remote call;
//! an in-flight call is allowed to finish.

use crate::desired::DesiredRecord;
use crate::error::{Error, Result};
use crate::traits::{ExistingRecord, RecordStore, RecordType, Zone};
use std::net::Ipv4Addr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What reconciliation did to a domain's keeper record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No record existed; one was created
    Created { id: String },
    /// A record already held the desired address
    Unchanged { id: String },
    /// The first listed record was rewritten to the desired address
    Updated { id: String, previous_address: String },
}

impl Outcome {
    /// Id of the record that now holds the desired address
    pub fn record_id(&self) -> &str {
        match self {
            Outcome::Created { id } | Outcome::Unchanged { id } | Outcome::Updated { id, .. } => id,
        }
    }
}

/// Result of reconciling a single domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainReport {
    pub record: DesiredRecord,
    pub outcome: Outcome,
    /// Ids of duplicate records removed, in list order
    pub deleted: Vec<String>,
}

impl DomainReport {
    /// Number of create/update/delete calls issued for this domain
    pub fn mutations(&self) -> usize {
        let keeper = match self.outcome {
            Outcome::Unchanged { .. } => 0,
            Outcome::Created { .. } | Outcome::Updated { .. } => 1,
        };
        keeper + self.deleted.len()
    }
}

/// Result of a complete reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub zone: Zone,
    /// One entry per desired record, in processing order
    pub domains: Vec<DomainReport>,
}

impl RunReport {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            domains: Vec::new(),
        }
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Unchanged { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.domains.iter().map(|d| d.deleted.len()).sum()
    }

    /// Total create/update/delete calls issued during the run
    pub fn mutations(&self) -> usize {
        self.domains.iter().map(DomainReport::mutations).sum()
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.domains.iter().filter(|d| pred(&d.outcome)).count()
    }
}

/// Holds the store handle and the zone resolved for one run
///
/// Built once per run with [`Reconciler::connect`]; never reused across runs.
pub struct Reconciler<'a> {
    store: &'a dyn RecordStore,
    zone: Zone,
    cancel: CancellationToken,
}

impl<'a> Reconciler<'a> {
    /// Resolve `zone_domain` and bind it to `store` for this run
    pub async fn connect(
        store: &'a dyn RecordStore,
        zone_domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        checkpoint(cancel)?;
        let zone = store
            .resolve_zone(zone_domain)
            .await
            .map_err(|e| e.context(format!("resolve zone {}", zone_domain)))?;
        debug!("Resolved zone {} to id {}", zone.domain, zone.id);

        Ok(Self::with_zone(store, zone, cancel))
    }

    /// Bind an already resolved zone
    pub fn with_zone(store: &'a dyn RecordStore, zone: Zone, cancel: &CancellationToken) -> Self {
        Self {
            store,
            zone,
            cancel: cancel.clone(),
        }
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// Reconcile every record in order, stopping at the first failure
    pub async fn reconcile_all(&self, desired: &[DesiredRecord]) -> Result<RunReport> {
        self.reconcile_all_with(desired, |_| {}).await
    }

    /// Like [`Reconciler::reconcile_all`], calling `on_domain` as each
    /// domain completes
    ///
    /// A domain that fails partway never reaches `on_domain`, even when some
    /// of its mutations were already applied.
    pub async fn reconcile_all_with(
        &self,
        desired: &[DesiredRecord],
        mut on_domain: impl FnMut(&DomainReport),
    ) -> Result<RunReport> {
        let mut report = RunReport::new(self.zone.clone());
        for record in desired {
            let domain = self.reconcile(record).await?;
            on_domain(&domain);
            report.domains.push(domain);
        }
        Ok(report)
    }

    /// Converge a single domain to exactly one A record holding its address
    pub async fn reconcile(&self, desired: &DesiredRecord) -> Result<DomainReport> {
        let domain = desired.domain.as_str();

        self.checkpoint()?;
        let existing = self
            .store
            .list_records(&self.zone.id, domain, RecordType::A)
            .await
            .map_err(|e| e.context(format!("list records for {}", domain)))?;

        if existing.is_empty() {
            self.checkpoint()?;
            let id = self
                .store
                .create_record(&self.zone.id, domain, &desired.address, false)
                .await
                .map_err(|e| e.context(format!("create record for {}", domain)))?;
            info!("Created {} record {} -> {} (id: {})", RecordType::A, domain, desired.address, id);

            return Ok(DomainReport {
                record: desired.clone(),
                outcome: Outcome::Created { id },
                deleted: Vec::new(),
            });
        }

        let (keeper, outcome) = match existing
            .iter()
            .position(|r| same_address(&r.address, &desired.address))
        {
            Some(index) => {
                let record = &existing[index];
                debug!("Record {} already has address {} (id: {})", domain, desired.address, record.id);
                (index, Outcome::Unchanged { id: record.id.clone() })
            }
            None => {
                let record = &existing[0];
                self.update(record, desired).await?;
                (
                    0,
                    Outcome::Updated {
                        id: record.id.clone(),
                        previous_address: record.address.clone(),
                    },
                )
            }
        };

        let mut deleted = Vec::new();
        for (index, record) in existing.iter().enumerate() {
            if index == keeper {
                continue;
            }
            self.checkpoint()?;
            self.store
                .delete_record(&self.zone.id, &record.id)
                .await
                .map_err(|e| e.context(format!("delete duplicate {} for {}", record.id, domain)))?;
            info!("Deleted duplicate record {} -> {} (id: {})", domain, record.address, record.id);
            deleted.push(record.id.clone());
        }

        Ok(DomainReport {
            record: desired.clone(),
            outcome,
            deleted,
        })
    }

    async fn update(&self, record: &ExistingRecord, desired: &DesiredRecord) -> Result<()> {
        self.checkpoint()?;
        self.store
            .update_record(
                &self.zone.id,
                &record.id,
                &desired.domain,
                &desired.address,
                record.proxied,
            )
            .await
            .map_err(|e| e.context(format!("update record {} for {}", record.id, desired.domain)))?;
        info!(
            "Updated record {} -> {} (was: {}, id: {})",
            desired.domain, desired.address, record.address, record.id
        );
        Ok(())
    }

    fn checkpoint(&self) -> Result<()> {
        checkpoint(&self.cancel)
    }
}

/// Resolve the zone and reconcile `desired` in one call
pub async fn reconcile_run(
    store: &dyn RecordStore,
    zone_domain: &str,
    desired: &[DesiredRecord],
    cancel: &CancellationToken,
) -> Result<RunReport> {
    Reconciler::connect(store, zone_domain, cancel)
        .await?
        .reconcile_all(desired)
        .await
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Whether an existing record's content is the desired IPv4 address
///
/// Content that does not parse as IPv4 never matches and gets rewritten.
fn same_address(existing: &str, desired: &str) -> bool {
    match (existing.trim().parse::<Ipv4Addr>(), desired.parse::<Ipv4Addr>()) {
        (Ok(existing), Ok(desired)) => existing == desired,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;

    fn zone() -> Zone {
        Zone::new("zone-1", "example.com")
    }

    #[test]
    fn same_address_compares_parsed_ips() {
        assert!(same_address("10.0.0.1", "10.0.0.1"));
        assert!(!same_address("10.0.0.1", "10.0.0.2"));
        assert!(same_address(" 10.0.0.1", "10.0.0.1"));
        assert!(!same_address("not-an-ip", "10.0.0.1"));
        assert!(!same_address("::ffff:10.0.0.1", "10.0.0.1"));
    }

    #[test]
    fn report_counters() {
        let mut report = RunReport::new(zone());
        report.domains.push(DomainReport {
            record: DesiredRecord::new("a.example.com", "10.0.0.1"),
            outcome: Outcome::Created { id: "1".into() },
            deleted: vec![],
        });
        report.domains.push(DomainReport {
            record: DesiredRecord::new("b.example.com", "10.0.0.2"),
            outcome: Outcome::Updated {
                id: "2".into(),
                previous_address: "10.0.0.9".into(),
            },
            deleted: vec!["3".into(), "4".into()],
        });
        report.domains.push(DomainReport {
            record: DesiredRecord::new("c.example.com", "10.0.0.3"),
            outcome: Outcome::Unchanged { id: "5".into() },
            deleted: vec![],
        });

        assert_eq!(report.created(), 1);
        assert_eq!(report.updated(), 1);
        assert_eq!(report.unchanged(), 1);
        assert_eq!(report.deleted(), 2);
        assert_eq!(report.mutations(), 4);
    }

    #[tokio::test]
    async fn connect_resolves_zone_once() {
        let store = MemoryRecordStore::with_zone(zone());
        let cancel = CancellationToken::new();

        let reconciler = Reconciler::connect(&store, "example.com", &cancel).await.unwrap();
        assert_eq!(reconciler.zone().id, "zone-1");
    }

    #[tokio::test]
    async fn unknown_zone_fails_before_record_work() {
        let store = MemoryRecordStore::with_zone(zone());
        let cancel = CancellationToken::new();

        let err = reconcile_run(
            &store,
            "other.com",
            &[DesiredRecord::new("a.other.com", "10.0.0.1")],
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err.root(), Error::NotFound(_)));
        assert!(store.records("zone-1").await.is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_call() {
        let store = MemoryRecordStore::with_zone(zone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Reconciler::connect(&store, "example.com", &cancel)
            .await
            .err()
            .unwrap();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn unparsable_record_content_is_rewritten() {
        let store = MemoryRecordStore::with_zone(zone());
        store.insert("zone-1", "a.example.com", "garbage", true).await;
        let cancel = CancellationToken::new();

        let reconciler = Reconciler::with_zone(&store, zone(), &cancel);
        let report = reconciler
            .reconcile(&DesiredRecord::new("a.example.com", "10.0.0.1"))
            .await
            .unwrap();

        assert!(matches!(report.outcome, Outcome::Updated { .. }));
        assert_eq!(report.mutations(), 1);
    }
}
