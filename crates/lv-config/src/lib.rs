use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_CHANNEL_PATH: &str = "/transactions/stream";
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Environment variables that override file values, applied after merging.
pub const ENV_BASE_URL: &str = "LV_API_BASE_URL";
pub const ENV_CHANNEL_URL: &str = "LV_CHANNEL_URL";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "LV_REQUEST_TIMEOUT_MS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub channel: ChannelConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout. Absent means the HTTP client's default.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ChannelConfig {
    /// Full WebSocket URL. When absent it is derived from `api.base_url`.
    pub url: Option<String>,
    pub path: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: DEFAULT_CHANNEL_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// WebSocket endpoint of the push channel.
    pub fn channel_url(&self) -> Result<String> {
        if let Some(url) = &self.channel.url {
            return Ok(url.clone());
        }
        let base = self.api.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            bail!("CONFIG_INVALID api.base_url must be http(s): {base}");
        };
        Ok(format!("{ws_base}{}", self.channel.path))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.api.request_timeout_ms.map(Duration::from_millis)
    }

    /// Apply `LV_*` overrides read through `lookup`.
    ///
    /// Taking a lookup instead of reading the process environment keeps this
    /// testable without mutating global state.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_BASE_URL) {
            self.api.base_url = v;
        }
        if let Some(v) = lookup(ENV_CHANNEL_URL) {
            self.channel.url = Some(v);
        }
        if let Some(v) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            let ms = v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{ENV_REQUEST_TIMEOUT_MS} is not a number: {v}"))?;
            self.api.request_timeout_ms = Some(ms);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let base = &self.api.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            bail!("CONFIG_INVALID api.base_url must start with http:// or https://: {base}");
        }
        if let Some(url) = &self.channel.url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                bail!("CONFIG_INVALID channel.url must start with ws:// or wss://: {url}");
            }
        }
        if !self.channel.path.starts_with('/') {
            bail!(
                "CONFIG_INVALID channel.path must start with '/': {}",
                self.channel.path
            );
        }
        if self.engine.queue_capacity == 0 {
            bail!("CONFIG_INVALID engine.queue_capacity must be positive");
        }
        if self.api.request_timeout_ms == Some(0) {
            bail!("CONFIG_INVALID api.request_timeout_ms must be positive");
        }
        Ok(())
    }
}

/// Effective configuration plus its fingerprint.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ClientConfig,
    pub config_hash: String,
    pub canonical_json: String,
}

impl LoadedConfig {
    /// Apply env overrides and re-hash so the fingerprint covers them.
    pub fn with_env_overrides<F>(self, lookup: F) -> Result<LoadedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.config;
        config.apply_env_overrides(lookup)?;
        seal(config)
    }

    /// Same as [`Self::with_env_overrides`] against the process environment.
    pub fn with_process_env(self) -> Result<LoadedConfig> {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML docs in order (later docs override earlier ones) on top of the
/// defaults. No docs yields the defaults.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty file parses to null; treat it as an empty layer.
        if v_json.is_null() {
            continue;
        }
        merged = deep_merge(merged, v_json);
    }

    let config: ClientConfig =
        serde_json::from_value(merged).context("CONFIG_INVALID unrecognized or mistyped key")?;
    seal(config)
}

fn seal(config: ClientConfig) -> Result<LoadedConfig> {
    config.validate()?;
    let value = serde_json::to_value(&config).context("config serialize failed")?;
    let canonical_json = canonicalize_json(&value)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config,
        config_hash,
        canonical_json,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json's default map is ordered by key, so this is stable.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
