use lv_schemas::{EntityKind, EntityStatus, Summary, Transaction};
use tracing::debug;

use crate::event::{decode, ChannelEvent};
use crate::store::EntityStore;

/// Network work a rule asks the runtime to perform. The result comes back
/// through [`Reconciler::apply_fetched_summary`] or
/// [`Reconciler::apply_resync_transactions`] / [`Reconciler::apply_resync_summaries`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FollowUp {
    /// Pull the whole collection and replace the store with it.
    Resync(EntityKind),
    /// Fetch one summary by id and upsert it at the front.
    FetchSummary {
        id: String,
        on_failure: FetchFallback,
    },
}

/// What to do when a [`FollowUp::FetchSummary`] fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchFallback {
    /// Degrade to a full summaries re-pull.
    Resync,
    /// Log and keep whatever is in the store.
    Skip,
}

/// Immediate effect of a rule on the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreEffect {
    Upserted,
    Patched,
    Untouched,
}

/// Outcome of routing one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub effect: StoreEffect,
    pub follow_up: Option<FollowUp>,
}

impl Decision {
    fn local(effect: StoreEffect) -> Self {
        Self {
            effect,
            follow_up: None,
        }
    }
}

/// Event router plus the two collection stores it reconciles.
///
/// Exactly one owner drives a `Reconciler`; every mutation is a plain
/// `&mut self` call.
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    transactions: EntityStore<Transaction>,
    summaries: EntityStore<Summary>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> &EntityStore<Transaction> {
        &self.transactions
    }

    pub fn summaries(&self) -> &EntityStore<Summary> {
        &self.summaries
    }

    /// Decode a raw channel message and route it. Undecodable messages are
    /// dropped and yield `None`.
    pub fn ingest(&mut self, raw: &str) -> Option<Decision> {
        decode(raw).map(|event| self.route(event))
    }

    pub fn route(&mut self, event: ChannelEvent) -> Decision {
        let tag = event.tag();
        let decision = match event {
            ChannelEvent::TxCreated(tx) => self.on_tx_created(tx),
            ChannelEvent::TxStatusUpdated { id, status } => self.on_tx_status_updated(id, status),
            ChannelEvent::SummaryCreated { id, .. } => Self::on_summary_created(id),
            ChannelEvent::SummaryUpdated {
                id,
                status,
                preview,
            } => self.on_summary_updated(id, status, preview),
        };
        debug!(tag, effect = ?decision.effect, follow_up = ?decision.follow_up, "event routed");
        decision
    }

    // -----------------------------------------------------------------------
    // Rules
    // -----------------------------------------------------------------------

    /// The event carries the whole transaction; it supersedes any optimistic
    /// copy of the same id.
    fn on_tx_created(&mut self, tx: Transaction) -> Decision {
        self.transactions.upsert_front(tx);
        Decision::local(StoreEffect::Upserted)
    }

    /// Unknown id means the matching created event was missed; only a full
    /// re-pull can recover it.
    fn on_tx_status_updated(&mut self, id: String, status: EntityStatus) -> Decision {
        if self
            .transactions
            .patch_if_present(&id, |tx| tx.status = status)
        {
            return Decision::local(StoreEffect::Patched);
        }
        Decision {
            effect: StoreEffect::Untouched,
            follow_up: Some(FollowUp::Resync(EntityKind::Transactions)),
        }
    }

    /// The event is only a notice; the stored value always comes from a fetch.
    fn on_summary_created(id: String) -> Decision {
        Decision {
            effect: StoreEffect::Untouched,
            follow_up: Some(FollowUp::FetchSummary {
                id,
                on_failure: FetchFallback::Resync,
            }),
        }
    }

    /// Placeholder now, authoritative fetch always.
    fn on_summary_updated(
        &mut self,
        id: String,
        status: EntityStatus,
        preview: Option<String>,
    ) -> Decision {
        let preview = preview.filter(|p| !p.is_empty());
        let patched = self.summaries.patch_if_present(&id, |s| {
            s.status = status;
            if s.result.is_none() {
                s.result = preview;
            }
        });
        Decision {
            effect: if patched {
                StoreEffect::Patched
            } else {
                StoreEffect::Untouched
            },
            follow_up: Some(FollowUp::FetchSummary {
                id,
                on_failure: FetchFallback::Skip,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Follow-up completions and local writes
    // -----------------------------------------------------------------------

    pub fn apply_fetched_summary(&mut self, summary: Summary) {
        self.summaries.upsert_front(summary);
    }

    pub fn apply_resync_transactions(&mut self, fetched: Vec<Transaction>) {
        self.transactions.replace_all(fetched);
    }

    pub fn apply_resync_summaries(&mut self, fetched: Vec<Summary>) {
        self.summaries.replace_all(fetched);
    }

    /// Store step of the optimistic writer: the create response is inserted
    /// before any channel echo arrives.
    pub fn record_created_transaction(&mut self, tx: Transaction) {
        self.transactions.upsert_front(tx);
    }

    pub fn record_created_summary(&mut self, summary: Summary) {
        self.summaries.upsert_front(summary);
    }
}
