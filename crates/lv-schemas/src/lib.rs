//! lv-schemas
//!
//! Wire and domain types shared by every lv crate: the two entity kinds
//! (transactions and summaries), their status enumeration, the create
//! payloads sent to the server, and the [`Entity`] trait the reconciliation
//! store is generic over.
//!
//! Field names on the wire follow the server (`monto`, `tipo`, status values
//! in Spanish); Rust-side names are English.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod timestamp;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Processing status shared by transactions and summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "procesado")]
    Processed,
    #[serde(rename = "fallido")]
    Failed,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Pending => "pendiente",
            EntityStatus::Processed => "procesado",
            EntityStatus::Failed => "fallido",
        }
    }

    /// Strict parse of the wire value. Unknown strings yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pendiente" => Some(EntityStatus::Pending),
            "procesado" => Some(EntityStatus::Processed),
            "fallido" => Some(EntityStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// The two server-owned collections the client mirrors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Transactions,
    Summaries,
}

impl EntityKind {
    /// Collection path segment on the HTTP API.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Transactions => "transactions",
            EntityKind::Summaries => "summaries",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection())
    }
}

/// A record tracked by the reconciliation store.
///
/// Merging is always keyed by [`Entity::id`]; the idempotency key is carried
/// for tracing only.
pub trait Entity: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Called by the store when `self` replaces `previous` (same id).
    ///
    /// Lets a kind keep values a newer snapshot must not erase. The default
    /// is a plain overwrite.
    fn absorb_previous(&mut self, previous: &Self) {
        let _ = previous;
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "monto")]
    pub amount: f64,
    #[serde(rename = "tipo")]
    pub tx_type: String,
    pub status: EntityStatus,
    pub idempotency_key: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Entity for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Body of a transaction create request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionCreate {
    pub user_id: String,
    #[serde(rename = "monto")]
    pub amount: f64,
    #[serde(rename = "tipo")]
    pub tx_type: String,
}

/// Which server endpoint a transaction create goes through.
///
/// `Async` enqueues background processing and produces channel events;
/// `Sync` persists the row and returns without any echo on the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateMode {
    Sync,
    Async,
}

impl CreateMode {
    /// Prefix used for locally generated idempotency keys.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            CreateMode::Sync => "sync-tx",
            CreateMode::Async => "async-tx",
        }
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub id: String,
    pub source: String,
    pub status: EntityStatus,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub idempotency_key: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Entity for Summary {
    fn id(&self) -> &str {
        &self.id
    }

    /// A stored result survives a snapshot that carries none, unless that
    /// snapshot reports the job as failed (the server clears the result then).
    fn absorb_previous(&mut self, previous: &Self) {
        if self.result.is_none() && self.status != EntityStatus::Failed {
            self.result = previous.result.clone();
        }
    }
}

/// Body of a summary create request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCreate {
    pub source: String,
    pub text: String,
}

/// Idempotency-key prefix for summary creates.
pub const SUMMARY_KEY_PREFIX: &str = "async-sum";
