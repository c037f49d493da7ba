use lv_schemas::{Summary, Transaction};
use serde::Serialize;

/// Point-in-time copy of both collections, newest first.
///
/// `revision` increases by one on every store mutation; it starts at 0 for
/// the empty view.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub revision: u64,
    pub transactions: Vec<Transaction>,
    pub summaries: Vec<Summary>,
}

impl ViewSnapshot {
    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn summary(&self, id: &str) -> Option<&Summary> {
        self.summaries.iter().find(|s| s.id == id)
    }

    pub fn transaction_ids(&self) -> Vec<&str> {
        self.transactions.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn summary_ids(&self) -> Vec<&str> {
        self.summaries.iter().map(|s| s.id.as_str()).collect()
    }
}
