//! lv-gateway
//!
//! Data access boundary: the request/response calls the live view needs from
//! the server. [`DataGateway`] is the seam the runtime depends on;
//! [`HttpGateway`] is the reqwest-backed implementation.
//!
//! This crate does not touch the view. It only fetches and creates.

mod error;
mod http;

pub use error::GatewayError;
pub use http::HttpGateway;

use lv_schemas::{CreateMode, Summary, SummaryCreate, Transaction, TransactionCreate};

/// Server operations consumed by the reconciliation runtime.
///
/// Implementations must be `Send + Sync`: the runtime calls them from spawned
/// tasks while the view owner keeps running.
#[async_trait::async_trait]
pub trait DataGateway: Send + Sync {
    /// Full transaction list, newest first as ordered by the server.
    async fn list_transactions(&self) -> Result<Vec<Transaction>, GatewayError>;

    async fn create_transaction(
        &self,
        mode: CreateMode,
        payload: &TransactionCreate,
        idempotency_key: &str,
    ) -> Result<Transaction, GatewayError>;

    /// Full summary list, newest first as ordered by the server.
    async fn list_summaries(&self) -> Result<Vec<Summary>, GatewayError>;

    /// Fails with [`GatewayError::NotFound`] for an unknown id.
    async fn get_summary(&self, id: &str) -> Result<Summary, GatewayError>;

    async fn create_summary(
        &self,
        payload: &SummaryCreate,
        idempotency_key: &str,
    ) -> Result<Summary, GatewayError>;
}
