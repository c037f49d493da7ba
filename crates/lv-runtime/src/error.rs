use std::fmt;

use lv_gateway::GatewayError;

/// The owner task has stopped; no further commands can be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineClosed;

impl fmt::Display for EngineClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reconciliation engine is no longer running")
    }
}

impl std::error::Error for EngineClosed {}

/// A create intent that did not end up in the view.
///
/// `Rejected` leaves the view untouched. There is no automatic retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    Rejected(GatewayError),
    EngineClosed,
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateError::Rejected(e) => write!(f, "create failed: {e}"),
            CreateError::EngineClosed => write!(f, "create succeeded but {EngineClosed}"),
        }
    }
}

impl std::error::Error for CreateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CreateError::Rejected(e) => Some(e),
            CreateError::EngineClosed => None,
        }
    }
}

impl From<EngineClosed> for CreateError {
    fn from(_: EngineClosed) -> Self {
        CreateError::EngineClosed
    }
}

/// A caller-requested refresh that could not complete. The view keeps its
/// previous contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Gateway(GatewayError),
    EngineClosed,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Gateway(e) => write!(f, "refresh failed: {e}"),
            FetchError::EngineClosed => write!(f, "refresh aborted: {EngineClosed}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Gateway(e) => Some(e),
            FetchError::EngineClosed => None,
        }
    }
}

impl From<GatewayError> for FetchError {
    fn from(e: GatewayError) -> Self {
        FetchError::Gateway(e)
    }
}

impl From<EngineClosed> for FetchError {
    fn from(_: EngineClosed) -> Self {
        FetchError::EngineClosed
    }
}
