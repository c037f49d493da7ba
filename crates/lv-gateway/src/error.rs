use std::fmt;

/// Errors a [`crate::DataGateway`] call may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// 404 from the server.
    NotFound { path: String },
    /// The server refused the payload (400, 409, 422).
    Validation { status: u16, body: String },
    /// Any other non-success status.
    Http { status: u16, body: String },
    /// Connection, TLS, or timeout failure before a status was received.
    Network(String),
    /// A success response whose body could not be decoded.
    Decode(String),
    /// The client could not be built from its configuration.
    Config(String),
}

impl GatewayError {
    pub(crate) fn from_status(path: &str, status: u16, body: String) -> Self {
        match status {
            404 => GatewayError::NotFound {
                path: path.to_string(),
            },
            400 | 409 | 422 => GatewayError::Validation { status, body },
            _ => GatewayError::Http { status, body },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::NotFound { path } => write!(f, "not found: {path}"),
            GatewayError::Validation { status, body } => {
                write!(f, "rejected by server (HTTP {status}): {body}")
            }
            GatewayError::Http { status, body } => write!(f, "HTTP {status}: {body}"),
            GatewayError::Network(msg) => write!(f, "network error: {msg}"),
            GatewayError::Decode(msg) => write!(f, "decode error: {msg}"),
            GatewayError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}
