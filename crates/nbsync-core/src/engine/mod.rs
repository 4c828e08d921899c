//! Sync engine
//!
//! The SyncEngine is responsible for:
//! - Fetching the peer list via PeerSource
//! - Building the desired record set
//! - Reconciling the zone via RecordStore
//! - Repeating on a fixed interval until cancelled
//!
//! ## Architecture
//!
//! ```text
//!      interval tick
//!            │
//!            ▼
//! ┌─────────────────────┐     ┌──────────────┐
//! │     SyncEngine      │────►│  PeerSource  │  fetch peers
//! │     (run_once)      │     └──────────────┘
//! └─────────────────────┘
//!            │ build_desired_state
//!            ▼
//! ┌─────────────────────┐     ┌──────────────┐
//! │     Reconciler      │────►│ RecordStore  │  resolve zone, list,
//! └─────────────────────┘     └──────────────┘  create/update/delete
//!            │
//!            ▼
//!      SyncEvent channel
//! ```
//!
//! ## Run Flow
//!
//! 1. Fetch peers
//! 2. Validate every peer domain and address (no store calls on failure)
//! 3. Resolve the zone once
//! 4. Reconcile each domain in order, fail-fast
//! 5. Emit events for monitoring/logging
//!
//! Record events for a domain go out only once that domain completes. If a
//! domain fails partway, e.g. its update lands and a duplicate delete is then
//! rejected, the run ends with `RunFailed` and no `RecordUpdated` is sent for
//! the applied change. The next run reports it as `RecordUnchanged`.
//!
//! Runs execute inline in the loop, so two runs never overlap. A failed run
//! is logged and retried from scratch on the next tick.

use crate::config::SyncConfig;
use crate::desired::build_desired_state;
use crate::error::{Error, Result};
use crate::reconcile::{DomainReport, Outcome, Reconciler, RunReport};
use crate::traits::{PeerSource, RecordStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Engine loop started
    Started {
        zone_domain: String,
        interval: Duration,
    },

    /// A reconciliation run started
    RunStarted { run: u64 },

    /// A record was created for a domain that had none
    RecordCreated {
        domain: String,
        address: String,
        id: String,
    },

    /// An existing record was rewritten to the desired address
    RecordUpdated {
        domain: String,
        address: String,
        previous_address: String,
        id: String,
    },

    /// A record already held the desired address
    RecordUnchanged {
        domain: String,
        address: String,
        id: String,
    },

    /// A duplicate record was deleted
    DuplicateDeleted { domain: String, id: String },

    /// A run completed for every domain
    RunSucceeded {
        run: u64,
        domains: usize,
        mutations: usize,
    },

    /// A run stopped at its first failure
    RunFailed { run: u64, error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Core sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Start with [`SyncEngine::run()`], passing a cancellation token
/// 3. Cancel the token to stop; an in-flight run stops at its next
///    remote-call boundary
///
/// [`SyncEngine::run_once()`] performs a single pass without the loop.
pub struct SyncEngine {
    /// Source of the peer list
    peer_source: Box<dyn PeerSource>,

    /// Store holding the zone's records
    store: Box<dyn RecordStore>,

    /// Zone all peers must belong to
    zone_domain: String,

    /// Time between runs
    interval: Duration,

    /// Run counter, starting at 1
    runs: AtomicU64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        peer_source: Box<dyn PeerSource>,
        store: Box<dyn RecordStore>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            peer_source,
            store,
            zone_domain: config.zone_domain,
            interval: config.engine.interval,
            runs: AtomicU64::new(0),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run immediately, then every interval, until `cancel` fires
    ///
    /// Failed runs are logged and do not stop the loop. A run that observes
    /// cancellation ends the loop.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        self.emit_event(SyncEvent::Started {
            zone_domain: self.zone_domain.clone(),
            interval: self.interval,
        });
        info!(
            "Syncing peers into zone {} every {:?} (store: {}, peers: {})",
            self.zone_domain,
            self.interval,
            self.store.provider_name(),
            self.peer_source.source_name()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break "Shutdown signal";
                }

                _ = ticker.tick() => {
                    match self.run_once(&cancel).await {
                        Ok(_) => {}
                        Err(e) if e.is_cancelled() => {
                            info!("Run cancelled by shutdown signal");
                            break "Shutdown signal during run";
                        }
                        Err(e) => {
                            error!("Sync run failed: {}", e);
                        }
                    }
                }
            }
        };

        self.emit_event(SyncEvent::Stopped {
            reason: reason.to_string(),
        });
        info!("Engine stopped");

        Ok(())
    }

    /// Perform one full reconciliation pass
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<RunReport> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit_event(SyncEvent::RunStarted { run });
        debug!("Sync run {} started", run);

        match self.reconcile_peers(cancel).await {
            Ok(report) => {
                info!(
                    "Sync run {} complete: {} domain(s), {} created, {} updated, {} unchanged, {} duplicate(s) deleted",
                    run,
                    report.domains.len(),
                    report.created(),
                    report.updated(),
                    report.unchanged(),
                    report.deleted()
                );
                self.emit_event(SyncEvent::RunSucceeded {
                    run,
                    domains: report.domains.len(),
                    mutations: report.mutations(),
                });
                Ok(report)
            }
            Err(e) => {
                self.emit_event(SyncEvent::RunFailed {
                    run,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn reconcile_peers(&self, cancel: &CancellationToken) -> Result<RunReport> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let peers = self
            .peer_source
            .fetch_peers()
            .await
            .map_err(|e| e.context("get peers"))?;
        debug!("Fetched {} peer(s) from {}", peers.len(), self.peer_source.source_name());

        let desired = build_desired_state(&peers, &self.zone_domain)?;

        let reconciler = Reconciler::connect(&*self.store, &self.zone_domain, cancel).await?;
        reconciler
            .reconcile_all_with(&desired, |domain| self.emit_domain_events(domain))
            .await
    }

    fn emit_domain_events(&self, report: &DomainReport) {
        let domain = report.record.domain.clone();
        let address = report.record.address.clone();

        let event = match &report.outcome {
            Outcome::Created { id } => SyncEvent::RecordCreated {
                domain: domain.clone(),
                address,
                id: id.clone(),
            },
            Outcome::Updated {
                id,
                previous_address,
            } => SyncEvent::RecordUpdated {
                domain: domain.clone(),
                address,
                previous_address: previous_address.clone(),
                id: id.clone(),
            },
            Outcome::Unchanged { id } => SyncEvent::RecordUnchanged {
                domain: domain.clone(),
                address,
                id: id.clone(),
            },
        };
        self.emit_event(event);

        for id in &report.deleted {
            self.emit_event(SyncEvent::DuplicateDeleted {
                domain: domain.clone(),
                id: id.clone(),
            });
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening; events are optional.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
