use std::time::Duration;

use lv_schemas::{CreateMode, Summary, SummaryCreate, Transaction, TransactionCreate};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{DataGateway, GatewayError};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// reqwest-backed [`DataGateway`].
///
/// Any non-success status becomes an error carrying the status and body text.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    /// Client with reqwest defaults (no overall request timeout).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Base URL plus `segments`, each percent-encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, GatewayError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            GatewayError::Config(format!("bad base url '{}': {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                GatewayError::Config(format!("base url cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, GatewayError> {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        debug!(%path, "GET");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        read_json(&path, resp).await
    }

    async fn post_json<B, T>(
        &self,
        segments: &[&str],
        body: &B,
        idempotency_key: &str,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        debug!(%path, idempotency_key, "POST");
        let resp = self
            .http
            .post(url)
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        read_json(&path, resp).await
    }
}

async fn read_json<T: DeserializeOwned>(
    path: &str,
    resp: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GatewayError::from_status(path, status.as_u16(), body));
    }
    resp.json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(format!("{path}: {e}")))
}

fn create_path(mode: CreateMode) -> &'static [&'static str] {
    match mode {
        CreateMode::Sync => &["transactions", "create"],
        CreateMode::Async => &["transactions", "async-process"],
    }
}

#[async_trait::async_trait]
impl DataGateway for HttpGateway {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, GatewayError> {
        self.get_json(&["transactions"]).await
    }

    async fn create_transaction(
        &self,
        mode: CreateMode,
        payload: &TransactionCreate,
        idempotency_key: &str,
    ) -> Result<Transaction, GatewayError> {
        self.post_json(create_path(mode), payload, idempotency_key)
            .await
    }

    async fn list_summaries(&self) -> Result<Vec<Summary>, GatewayError> {
        self.get_json(&["summaries"]).await
    }

    async fn get_summary(&self, id: &str) -> Result<Summary, GatewayError> {
        // Dot segments would be resolved away by the URL and name another
        // resource; no server id looks like that.
        if id.is_empty() || id == "." || id == ".." {
            return Err(GatewayError::NotFound {
                path: format!("/summaries/{id}"),
            });
        }
        self.get_json(&["summaries", id]).await
    }

    async fn create_summary(
        &self,
        payload: &SummaryCreate,
        idempotency_key: &str,
    ) -> Result<Summary, GatewayError> {
        self.post_json(&["summaries", "async"], payload, idempotency_key)
            .await
    }
}
