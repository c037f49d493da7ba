//! The single owner of the reconciled view.
//!
//! Nothing outside this task touches the [`Reconciler`]. Fetches requested by
//! rules run as spawned tasks that hold a queue sender; their results come
//! back as commands, so completions interleave only at command boundaries.
//! There is no cancellation: a fetch always completes and applies, and the
//! later arrival wins.

use std::sync::Arc;

use lv_gateway::DataGateway;
use lv_reconcile::{FetchFallback, FollowUp, Reconciler, StoreEffect};
use lv_schemas::{EntityKind, Summary, Transaction};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::handle::EngineHandle;
use crate::view::ViewSnapshot;

/// Tunables for [`spawn_engine`].
#[derive(Clone, Debug)]
pub struct EngineSettings {
    /// Bound of the command queue. Producers wait when it is full.
    pub queue_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

pub(crate) enum Command {
    /// Raw text from the duplex channel.
    Inbound(String),
    /// Optimistic write after a successful create response.
    RecordTransaction {
        tx: Transaction,
        ack: oneshot::Sender<()>,
    },
    RecordSummary {
        summary: Summary,
        ack: oneshot::Sender<()>,
    },
    /// Caller-requested full re-pull of both collections.
    ReplaceAll {
        transactions: Vec<Transaction>,
        summaries: Vec<Summary>,
        ack: oneshot::Sender<()>,
    },
    FetchedSummary(Summary),
    ResyncedTransactions(Vec<Transaction>),
    ResyncedSummaries(Vec<Summary>),
}

/// Start the owner task. Must be called inside a Tokio runtime.
///
/// The task stops once every [`EngineHandle`] clone is dropped and all
/// in-flight fetches have delivered their results.
pub fn spawn_engine(
    gateway: Arc<dyn DataGateway>,
    settings: EngineSettings,
) -> (EngineHandle, JoinHandle<()>) {
    let (commands, rx) = mpsc::channel(settings.queue_capacity.max(1));
    let (view_tx, view_rx) = watch::channel(ViewSnapshot::default());

    let owner = Owner {
        reconciler: Reconciler::new(),
        gateway: Arc::clone(&gateway),
        loopback: commands.downgrade(),
        view: view_tx,
        revision: 0,
    };
    let task = tokio::spawn(owner.run(rx));

    (EngineHandle::new(commands, gateway, view_rx), task)
}

struct Owner {
    reconciler: Reconciler,
    gateway: Arc<dyn DataGateway>,
    loopback: mpsc::WeakSender<Command>,
    view: watch::Sender<ViewSnapshot>,
    revision: u64,
}

impl Owner {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        info!("reconciliation engine started");
        while let Some(cmd) = rx.recv().await {
            self.apply(cmd);
        }
        info!(revision = self.revision, "reconciliation engine stopped");
    }

    fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Inbound(raw) => {
                let Some(decision) = self.reconciler.ingest(&raw) else {
                    return;
                };
                if decision.effect != StoreEffect::Untouched {
                    self.publish();
                }
                if let Some(follow_up) = decision.follow_up {
                    self.dispatch(follow_up);
                }
            }
            Command::RecordTransaction { tx, ack } => {
                debug!(id = %tx.id, key = %tx.idempotency_key, "optimistic transaction write");
                self.reconciler.record_created_transaction(tx);
                self.publish();
                let _ = ack.send(());
            }
            Command::RecordSummary { summary, ack } => {
                debug!(id = %summary.id, key = %summary.idempotency_key, "optimistic summary write");
                self.reconciler.record_created_summary(summary);
                self.publish();
                let _ = ack.send(());
            }
            Command::ReplaceAll {
                transactions,
                summaries,
                ack,
            } => {
                info!(
                    transactions = transactions.len(),
                    summaries = summaries.len(),
                    "view refreshed"
                );
                self.reconciler.apply_resync_transactions(transactions);
                self.reconciler.apply_resync_summaries(summaries);
                self.publish();
                let _ = ack.send(());
            }
            Command::FetchedSummary(summary) => {
                debug!(id = %summary.id, status = %summary.status, "summary fetched");
                self.reconciler.apply_fetched_summary(summary);
                self.publish();
            }
            Command::ResyncedTransactions(list) => {
                info!(count = list.len(), "transactions resynced");
                self.reconciler.apply_resync_transactions(list);
                self.publish();
            }
            Command::ResyncedSummaries(list) => {
                info!(count = list.len(), "summaries resynced");
                self.reconciler.apply_resync_summaries(list);
                self.publish();
            }
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.view.send_replace(ViewSnapshot {
            revision: self.revision,
            transactions: self.reconciler.transactions().enumerate(),
            summaries: self.reconciler.summaries().enumerate(),
        });
    }

    fn dispatch(&self, follow_up: FollowUp) {
        // Upgrade fails only while the engine is shutting down.
        let Some(queue) = self.loopback.upgrade() else {
            debug!(?follow_up, "engine closing; follow-up dropped");
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        match follow_up {
            FollowUp::Resync(kind) => {
                tokio::spawn(resync(gateway, kind, queue));
            }
            FollowUp::FetchSummary { id, on_failure } => {
                tokio::spawn(fetch_summary(gateway, id, on_failure, queue));
            }
        }
    }
}

async fn resync(gateway: Arc<dyn DataGateway>, kind: EntityKind, queue: mpsc::Sender<Command>) {
    let cmd = match kind {
        EntityKind::Transactions => gateway
            .list_transactions()
            .await
            .map(Command::ResyncedTransactions),
        EntityKind::Summaries => gateway
            .list_summaries()
            .await
            .map(Command::ResyncedSummaries),
    };
    match cmd {
        Ok(cmd) => {
            let _ = queue.send(cmd).await;
        }
        Err(err) => warn!(%kind, %err, "resync failed; keeping current view"),
    }
}

async fn fetch_summary(
    gateway: Arc<dyn DataGateway>,
    id: String,
    on_failure: FetchFallback,
    queue: mpsc::Sender<Command>,
) {
    match gateway.get_summary(&id).await {
        Ok(summary) => {
            let _ = queue.send(Command::FetchedSummary(summary)).await;
        }
        Err(err) => match on_failure {
            FetchFallback::Resync => {
                warn!(%id, %err, "summary fetch failed; falling back to full re-fetch");
                resync(gateway, EntityKind::Summaries, queue).await;
            }
            FetchFallback::Skip => warn!(%id, %err, "summary fetch failed; skipped"),
        },
    }
}
