//! Channel message decoding.
//!
//! The duplex channel is not guaranteed to carry only our events, so decoding
//! fails closed: anything that is not a fully valid, recognised event becomes
//! a [`DecodeError`] and is dropped by the caller. A recognised tag with a
//! missing or wrongly typed required field never yields a partial event.

use lv_schemas::{timestamp, EntityStatus, Transaction};
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

pub const TAG_TX_CREATED: &str = "tx_created";
pub const TAG_TX_STATUS_UPDATED: &str = "tx_status_updated";
pub const TAG_SUMMARY_CREATED: &str = "summary_created";
pub const TAG_SUMMARY_UPDATED: &str = "summary_updated";

/// A validated push event.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    /// Authoritative new transaction, complete enough to insert as-is.
    TxCreated(Transaction),
    TxStatusUpdated {
        id: String,
        status: EntityStatus,
    },
    /// Announces a summary; details must be fetched.
    SummaryCreated {
        id: String,
        status: EntityStatus,
    },
    SummaryUpdated {
        id: String,
        status: EntityStatus,
        preview: Option<String>,
    },
}

impl ChannelEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            ChannelEvent::TxCreated(_) => TAG_TX_CREATED,
            ChannelEvent::TxStatusUpdated { .. } => TAG_TX_STATUS_UPDATED,
            ChannelEvent::SummaryCreated { .. } => TAG_SUMMARY_CREATED,
            ChannelEvent::SummaryUpdated { .. } => TAG_SUMMARY_UPDATED,
        }
    }
}

/// Why a message was not turned into an event. Never surfaced to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    NotJson,
    /// Valid JSON without a string `event` field.
    Untagged,
    UnknownTag(String),
    Malformed { tag: &'static str, reason: String },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotJson => write!(f, "channel message is not JSON"),
            Self::Untagged => write!(f, "channel message has no event tag"),
            Self::UnknownTag(tag) => write!(f, "unrecognised event tag '{tag}'"),
            Self::Malformed { tag, reason } => write!(f, "malformed '{tag}' event: {reason}"),
        }
    }
}

impl std::error::Error for DecodeError {}

// ---------------------------------------------------------------------------
// Wire-level payloads
// ---------------------------------------------------------------------------

// Unknown fields (`event`, `user_id` on updates, `source`, ...) are ignored.

#[derive(Debug, Deserialize)]
struct RawTxCreated {
    id: String,
    user_id: String,
    monto: f64,
    tipo: String,
    status: String,
    idempotency_key: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct RawStatusChange {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct RawSummaryUpdated {
    id: String,
    status: String,
    #[serde(default)]
    preview: Option<String>,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode and validate one raw channel message.
pub fn decode_event(raw: &str) -> Result<ChannelEvent, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| DecodeError::NotJson)?;
    let tag = value
        .get("event")
        .and_then(Value::as_str)
        .ok_or(DecodeError::Untagged)?;

    match tag {
        TAG_TX_CREATED => {
            let wire: RawTxCreated = payload(TAG_TX_CREATED, value)?;
            let id = require_id(TAG_TX_CREATED, &wire.id)?;
            let status = require_status(TAG_TX_CREATED, &wire.status)?;
            let created_at = timestamp::parse(&wire.created_at).ok_or_else(|| {
                DecodeError::Malformed {
                    tag: TAG_TX_CREATED,
                    reason: format!("bad created_at '{}'", wire.created_at),
                }
            })?;
            Ok(ChannelEvent::TxCreated(Transaction {
                id,
                user_id: wire.user_id,
                amount: wire.monto,
                tx_type: wire.tipo,
                status,
                idempotency_key: wire.idempotency_key,
                created_at,
            }))
        }
        TAG_TX_STATUS_UPDATED => {
            let wire: RawStatusChange = payload(TAG_TX_STATUS_UPDATED, value)?;
            Ok(ChannelEvent::TxStatusUpdated {
                id: require_id(TAG_TX_STATUS_UPDATED, &wire.id)?,
                status: require_status(TAG_TX_STATUS_UPDATED, &wire.status)?,
            })
        }
        TAG_SUMMARY_CREATED => {
            let wire: RawStatusChange = payload(TAG_SUMMARY_CREATED, value)?;
            Ok(ChannelEvent::SummaryCreated {
                id: require_id(TAG_SUMMARY_CREATED, &wire.id)?,
                status: require_status(TAG_SUMMARY_CREATED, &wire.status)?,
            })
        }
        TAG_SUMMARY_UPDATED => {
            let wire: RawSummaryUpdated = payload(TAG_SUMMARY_UPDATED, value)?;
            Ok(ChannelEvent::SummaryUpdated {
                id: require_id(TAG_SUMMARY_UPDATED, &wire.id)?,
                status: require_status(TAG_SUMMARY_UPDATED, &wire.status)?,
                preview: wire.preview,
            })
        }
        other => Err(DecodeError::UnknownTag(other.to_string())),
    }
}

/// [`decode_event`] with the error dropped. Rejections are traced, not raised.
pub fn decode(raw: &str) -> Option<ChannelEvent> {
    match decode_event(raw) {
        Ok(event) => Some(event),
        Err(err) => {
            trace!(%err, "dropping channel message");
            None
        }
    }
}

fn payload<T>(tag: &'static str, value: Value) -> Result<T, DecodeError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(value).map_err(|e| DecodeError::Malformed {
        tag,
        reason: e.to_string(),
    })
}

/// Ids are used verbatim; blank or whitespace-padded ones are rejected, not
/// normalized, so an event can never be merged under a different identity.
fn require_id(tag: &'static str, raw: &str) -> Result<String, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::Malformed {
            tag,
            reason: "empty id".to_string(),
        });
    }
    if raw.trim() != raw {
        return Err(DecodeError::Malformed {
            tag,
            reason: format!("id has surrounding whitespace: {raw:?}"),
        });
    }
    Ok(raw.to_string())
}

fn require_status(tag: &'static str, raw: &str) -> Result<EntityStatus, DecodeError> {
    EntityStatus::parse(raw).ok_or_else(|| DecodeError::Malformed {
        tag,
        reason: format!("unknown status '{raw}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tx_created() {
        let raw = r#"{"event":"tx_created","id":"t1","user_id":"u1","monto":12,
                      "tipo":"pago","status":"pendiente","idempotency_key":"async-tx-1",
                      "created_at":"2024-05-01T10:00:00.000001"}"#;
        let ev = decode_event(raw).unwrap();
        let ChannelEvent::TxCreated(tx) = ev else {
            panic!("expected TxCreated");
        };
        assert_eq!(tx.id, "t1");
        assert_eq!(tx.amount, 12.0);
        assert_eq!(tx.status, EntityStatus::Pending);
    }

    #[test]
    fn status_update_tolerates_extra_fields() {
        let raw = r#"{"event":"tx_status_updated","id":"t1","status":"procesado","user_id":"u1"}"#;
        assert_eq!(
            decode_event(raw).unwrap(),
            ChannelEvent::TxStatusUpdated {
                id: "t1".to_string(),
                status: EntityStatus::Processed,
            }
        );
    }

    #[test]
    fn summary_updated_preview_is_optional() {
        let with = r#"{"event":"summary_updated","id":"s1","status":"procesado","preview":"abc"}"#;
        let without = r#"{"event":"summary_updated","id":"s1","status":"procesado"}"#;
        let null = r#"{"event":"summary_updated","id":"s1","status":"procesado","preview":null}"#;

        match decode_event(with).unwrap() {
            ChannelEvent::SummaryUpdated { preview, .. } => {
                assert_eq!(preview.as_deref(), Some("abc"))
            }
            other => panic!("unexpected {other:?}"),
        }
        for raw in [without, null] {
            match decode_event(raw).unwrap() {
                ChannelEvent::SummaryUpdated { preview, .. } => assert_eq!(preview, None),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_non_json_and_untagged() {
        assert_eq!(decode_event("hello"), Err(DecodeError::NotJson));
        assert_eq!(decode_event(r#"{"id":"t1"}"#), Err(DecodeError::Untagged));
        assert_eq!(decode_event(r#"{"event":5}"#), Err(DecodeError::Untagged));
        assert_eq!(decode_event("[1,2]"), Err(DecodeError::Untagged));
    }

    #[test]
    fn rejects_unknown_tag() {
        assert_eq!(
            decode_event(r#"{"event":"ping"}"#),
            Err(DecodeError::UnknownTag("ping".to_string()))
        );
    }

    #[test]
    fn rejects_wrong_typed_or_missing_fields() {
        let cases = [
            r#"{"event":"tx_status_updated","id":42,"status":"procesado"}"#,
            r#"{"event":"tx_status_updated","status":"procesado"}"#,
            r#"{"event":"tx_status_updated","id":"t1","status":"done"}"#,
            r#"{"event":"tx_status_updated","id":"  ","status":"procesado"}"#,
            r#"{"event":"tx_status_updated","id":" t1","status":"procesado"}"#,
            r#"{"event":"summary_created","id":"s1\n","status":"pendiente"}"#,
            r#"{"event":"summary_updated","id":"s1","status":"procesado","preview":7}"#,
            r#"{"event":"tx_created","id":"t1","status":"pendiente"}"#,
            r#"{"event":"tx_created","id":"t1","user_id":"u1","monto":"12","tipo":"pago",
                "status":"pendiente","idempotency_key":"k","created_at":"2024-05-01T10:00:00"}"#,
            r#"{"event":"tx_created","id":"t1","user_id":"u1","monto":12,"tipo":"pago",
                "status":"pendiente","idempotency_key":"k","created_at":"soon"}"#,
        ];
        for raw in cases {
            assert!(
                matches!(decode_event(raw), Err(DecodeError::Malformed { .. })),
                "expected malformed: {raw}"
            );
        }
    }

    #[test]
    fn decode_swallows_errors() {
        assert!(decode("not json").is_none());
        assert!(decode(r#"{"event":"summary_created","id":"s1","status":"pendiente"}"#).is_some());
    }
}
