use std::sync::Arc;

use lv_gateway::DataGateway;
use lv_schemas::{
    CreateMode, Summary, SummaryCreate, Transaction, TransactionCreate, SUMMARY_KEY_PREFIX,
};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::warn;
use uuid::Uuid;

use crate::engine::Command;
use crate::error::{CreateError, EngineClosed, FetchError};
use crate::view::ViewSnapshot;

/// Cloneable front door to a running engine.
///
/// This is the renderer-facing surface: read or subscribe to the view, force
/// a refresh, issue create intents, and feed raw channel messages.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    gateway: Arc<dyn DataGateway>,
    view: watch::Receiver<ViewSnapshot>,
}

impl EngineHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        gateway: Arc<dyn DataGateway>,
        view: watch::Receiver<ViewSnapshot>,
    ) -> Self {
        Self {
            commands,
            gateway,
            view,
        }
    }

    /// Current view.
    pub fn snapshot(&self) -> ViewSnapshot {
        self.view.borrow().clone()
    }

    /// Receiver notified after every store mutation.
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.view.clone()
    }

    /// Wait until `pred` holds for the view and return that snapshot.
    pub async fn wait_until<F>(&self, pred: F) -> Result<ViewSnapshot, EngineClosed>
    where
        F: FnMut(&ViewSnapshot) -> bool,
    {
        let mut rx = self.view.clone();
        let snap = rx.wait_for(pred).await.map_err(|_| EngineClosed)?;
        Ok(snap.clone())
    }

    /// Queue one raw channel message. Decoding happens on the owner.
    pub async fn ingest(&self, raw: impl Into<String>) -> Result<(), EngineClosed> {
        self.commands
            .send(Command::Inbound(raw.into()))
            .await
            .map_err(|_| EngineClosed)
    }

    /// Re-pull both collections concurrently and replace the view.
    ///
    /// Nothing is replaced unless both lists arrive.
    pub async fn refresh(&self) -> Result<(), FetchError> {
        let (transactions, summaries) = tokio::try_join!(
            self.gateway.list_transactions(),
            self.gateway.list_summaries()
        )?;
        self.submit(|ack| Command::ReplaceAll {
            transactions,
            summaries,
            ack,
        })
        .await?;
        Ok(())
    }

    /// Create a transaction with a freshly generated idempotency key.
    pub async fn create_transaction(
        &self,
        mode: CreateMode,
        payload: &TransactionCreate,
    ) -> Result<Transaction, CreateError> {
        let key = idempotency_key(mode.key_prefix());
        self.create_transaction_with_key(mode, payload, &key).await
    }

    /// Issue the create call and, once the server answers, insert the returned
    /// transaction ahead of any channel confirmation. On failure the view is
    /// not touched.
    pub async fn create_transaction_with_key(
        &self,
        mode: CreateMode,
        payload: &TransactionCreate,
        idempotency_key: &str,
    ) -> Result<Transaction, CreateError> {
        let tx = self
            .gateway
            .create_transaction(mode, payload, idempotency_key)
            .await
            .map_err(|err| {
                warn!(%err, idempotency_key, "transaction create failed");
                CreateError::Rejected(err)
            })?;
        let recorded = tx.clone();
        self.submit(|ack| Command::RecordTransaction { tx: recorded, ack })
            .await?;
        Ok(tx)
    }

    pub async fn create_summary(&self, payload: &SummaryCreate) -> Result<Summary, CreateError> {
        let key = idempotency_key(SUMMARY_KEY_PREFIX);
        self.create_summary_with_key(payload, &key).await
    }

    pub async fn create_summary_with_key(
        &self,
        payload: &SummaryCreate,
        idempotency_key: &str,
    ) -> Result<Summary, CreateError> {
        let summary = self
            .gateway
            .create_summary(payload, idempotency_key)
            .await
            .map_err(|err| {
                warn!(%err, idempotency_key, "summary create failed");
                CreateError::Rejected(err)
            })?;
        let recorded = summary.clone();
        self.submit(|ack| Command::RecordSummary {
            summary: recorded,
            ack,
        })
        .await?;
        Ok(summary)
    }

    /// Send a command and wait until the owner has applied it.
    async fn submit<F>(&self, build: F) -> Result<(), EngineClosed>
    where
        F: FnOnce(oneshot::Sender<()>) -> Command,
    {
        let (ack, applied) = oneshot::channel();
        self.commands
            .send(build(ack))
            .await
            .map_err(|_| EngineClosed)?;
        applied.await.map_err(|_| EngineClosed)
    }
}

fn idempotency_key(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}
