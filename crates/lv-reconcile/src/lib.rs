//! lv-reconcile
//!
//! Reconciliation core for the client-side live view.
//!
//! Three unordered sources feed the same two collections:
//! - the client's own create responses (optimistic write),
//! - push events from the duplex channel,
//! - pull fetches issued as recovery when an event names an unknown id.
//!
//! Every source funnels into upsert-by-id on an [`EntityStore`], so arrival
//! order never produces duplicates. Deterministic, pure logic. No IO, no
//! async: rules that need the network return a [`FollowUp`] for the runtime
//! to execute and feed back.

mod event;
mod reconciler;
mod store;

pub use event::{decode, decode_event, ChannelEvent, DecodeError};
pub use reconciler::{Decision, FetchFallback, FollowUp, Reconciler, StoreEffect};
pub use store::EntityStore;
