//! lv-testkit
//!
//! In-memory [`DataGateway`] for scenario tests. Acts as a tiny server:
//! holds both collections in server order, assigns ids on create, counts
//! every call, and can be told to fail specific operations.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use lv_gateway::{DataGateway, GatewayError};
use lv_schemas::{
    timestamp, CreateMode, EntityStatus, Summary, SummaryCreate, Transaction, TransactionCreate,
};
use serde_json::json;

#[derive(Default)]
struct ServerState {
    /// Newest first, as the list endpoints return them.
    transactions: Vec<Transaction>,
    summaries: Vec<Summary>,
    failing_summary_gets: HashSet<String>,
    fail_lists: bool,
    reject_creates: Option<GatewayError>,
    next_id: u64,
    idempotency_keys: Vec<String>,
}

#[derive(Default)]
struct CallCounts {
    list_transactions: AtomicUsize,
    list_summaries: AtomicUsize,
    get_summary: AtomicUsize,
    create_transaction: AtomicUsize,
    create_summary: AtomicUsize,
}

/// Scripted server double.
#[derive(Default)]
pub struct ScriptedGateway {
    state: Mutex<ServerState>,
    calls: CallCounts,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ServerState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    // -- server-side data -------------------------------------------------

    /// Insert or replace a transaction on the server, at the top of the list.
    pub fn put_transaction(&self, tx: Transaction) {
        self.with_state(|s| {
            s.transactions.retain(|t| t.id != tx.id);
            s.transactions.insert(0, tx);
        });
    }

    /// Insert or replace a summary on the server, at the top of the list.
    pub fn put_summary(&self, summary: Summary) {
        self.with_state(|s| {
            s.summaries.retain(|x| x.id != summary.id);
            s.summaries.insert(0, summary);
        });
    }

    // -- failure injection --------------------------------------------------

    pub fn fail_get_summary(&self, id: &str) {
        self.with_state(|s| {
            s.failing_summary_gets.insert(id.to_string());
        });
    }

    pub fn set_fail_lists(&self, fail: bool) {
        self.with_state(|s| s.fail_lists = fail);
    }

    pub fn reject_creates_with(&self, err: GatewayError) {
        self.with_state(|s| s.reject_creates = Some(err));
    }

    // -- observation ----------------------------------------------------------

    pub fn list_transactions_calls(&self) -> usize {
        self.calls.list_transactions.load(Ordering::SeqCst)
    }

    pub fn list_summaries_calls(&self) -> usize {
        self.calls.list_summaries.load(Ordering::SeqCst)
    }

    pub fn get_summary_calls(&self) -> usize {
        self.calls.get_summary.load(Ordering::SeqCst)
    }

    pub fn create_transaction_calls(&self) -> usize {
        self.calls.create_transaction.load(Ordering::SeqCst)
    }

    pub fn create_summary_calls(&self) -> usize {
        self.calls.create_summary.load(Ordering::SeqCst)
    }

    pub fn idempotency_keys(&self) -> Vec<String> {
        self.with_state(|s| s.idempotency_keys.clone())
    }

    fn next_id(&self, prefix: &str) -> String {
        self.with_state(|s| {
            s.next_id += 1;
            format!("{prefix}{}", s.next_id)
        })
    }

    fn check_create(&self, idempotency_key: &str) -> Result<(), GatewayError> {
        self.with_state(|s| match &s.reject_creates {
            Some(err) => Err(err.clone()),
            None => {
                s.idempotency_keys.push(idempotency_key.to_string());
                Ok(())
            }
        })
    }

    fn list_unavailable(&self) -> Option<GatewayError> {
        self.with_state(|s| {
            s.fail_lists
                .then(|| GatewayError::Network("scripted list failure".to_string()))
        })
    }
}

#[async_trait::async_trait]
impl DataGateway for ScriptedGateway {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, GatewayError> {
        self.calls.list_transactions.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_unavailable() {
            return Err(err);
        }
        Ok(self.with_state(|s| s.transactions.clone()))
    }

    async fn create_transaction(
        &self,
        _mode: CreateMode,
        payload: &TransactionCreate,
        idempotency_key: &str,
    ) -> Result<Transaction, GatewayError> {
        self.calls.create_transaction.fetch_add(1, Ordering::SeqCst);
        self.check_create(idempotency_key)?;
        let tx = Transaction {
            id: self.next_id("t-srv-"),
            user_id: payload.user_id.clone(),
            amount: payload.amount,
            tx_type: payload.tx_type.clone(),
            status: EntityStatus::Pending,
            idempotency_key: idempotency_key.to_string(),
            created_at: Utc::now(),
        };
        self.put_transaction(tx.clone());
        Ok(tx)
    }

    async fn list_summaries(&self) -> Result<Vec<Summary>, GatewayError> {
        self.calls.list_summaries.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_unavailable() {
            return Err(err);
        }
        Ok(self.with_state(|s| s.summaries.clone()))
    }

    async fn get_summary(&self, id: &str) -> Result<Summary, GatewayError> {
        self.calls.get_summary.fetch_add(1, Ordering::SeqCst);
        self.with_state(|s| {
            if s.failing_summary_gets.contains(id) {
                return Err(GatewayError::Network(format!("scripted failure for {id}")));
            }
            s.summaries
                .iter()
                .find(|x| x.id == id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound {
                    path: format!("/summaries/{id}"),
                })
        })
    }

    async fn create_summary(
        &self,
        payload: &SummaryCreate,
        idempotency_key: &str,
    ) -> Result<Summary, GatewayError> {
        self.calls.create_summary.fetch_add(1, Ordering::SeqCst);
        self.check_create(idempotency_key)?;
        let summary = Summary {
            id: self.next_id("s-srv-"),
            source: payload.source.clone(),
            status: EntityStatus::Pending,
            result: None,
            error: None,
            idempotency_key: idempotency_key.to_string(),
            created_at: Utc::now(),
        };
        self.put_summary(summary.clone());
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Fixed creation time used by fixtures.
const FIXTURE_CREATED_AT: &str = "2024-05-01T10:00:00";

pub fn transaction(id: &str, status: EntityStatus) -> Transaction {
    Transaction {
        id: id.to_string(),
        user_id: "u1".to_string(),
        amount: 10.0,
        tx_type: "pago".to_string(),
        status,
        idempotency_key: format!("async-tx-{id}"),
        created_at: fixture_time(),
    }
}

pub fn summary(id: &str, status: EntityStatus, result: Option<&str>) -> Summary {
    Summary {
        id: id.to_string(),
        source: "manual".to_string(),
        status,
        result: result.map(str::to_string),
        error: None,
        idempotency_key: format!("async-sum-{id}"),
        created_at: fixture_time(),
    }
}

/// `tx_created` channel message carrying every field of `tx`.
pub fn tx_created_msg(tx: &Transaction) -> String {
    json!({
        "event": "tx_created",
        "id": tx.id,
        "user_id": tx.user_id,
        "monto": tx.amount,
        "tipo": tx.tx_type,
        "status": tx.status,
        "idempotency_key": tx.idempotency_key,
        "created_at": tx.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
    })
    .to_string()
}

pub fn tx_status_msg(id: &str, status: EntityStatus) -> String {
    json!({
        "event": "tx_status_updated",
        "id": id,
        "status": status,
        "user_id": "u1",
    })
    .to_string()
}

pub fn summary_created_msg(id: &str) -> String {
    json!({
        "event": "summary_created",
        "id": id,
        "status": EntityStatus::Pending,
        "source": "manual",
    })
    .to_string()
}

pub fn summary_updated_msg(id: &str, status: EntityStatus, preview: Option<&str>) -> String {
    let mut msg = json!({
        "event": "summary_updated",
        "id": id,
        "status": status,
    });
    if let Some(p) = preview {
        msg["source"] = json!("manual");
        msg["preview"] = json!(p);
    }
    msg.to_string()
}

fn fixture_time() -> chrono::DateTime<Utc> {
    timestamp::parse(FIXTURE_CREATED_AT).unwrap_or_else(Utc::now)
}
