//! lv-runtime
//!
//! Drives the reconciliation core against the real world.
//!
//! A single owner task holds the [`lv_reconcile::Reconciler`] and consumes one
//! command queue. Channel messages, create confirmations, and the completions
//! of fetches spawned by reconciliation rules all arrive on that queue, so
//! every store mutation is serialized without locks. Renderers read the view
//! through a watch channel of [`ViewSnapshot`]s.

mod engine;
mod error;
mod feed;
mod handle;
mod view;

pub use engine::{spawn_engine, EngineSettings};
pub use error::{CreateError, EngineClosed, FetchError};
pub use feed::run_channel_feed;
pub use handle::EngineHandle;
pub use view::ViewSnapshot;
