#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid address `{address}`: {message}")]
    InvalidAddress { address: String, message: String },

    #[error("invalid response data: {0}")]
    InvalidData(String),

    #[error("utxo polling was cancelled")]
    PollCancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures of a single logical Electrum call.
///
/// Per-endpoint variants carry the endpoint they came from so that the
/// failover policy can report which server produced the surfaced error.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("connection to {endpoint} failed: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid response from {endpoint}: {message}")]
    Protocol { endpoint: String, message: String },

    /// The server answered with an `error` object. Displays as the bare
    /// server message.
    #[error("{message}")]
    Server { endpoint: String, message: String },

    #[error("No endpoints available")]
    NoEndpoints,

    #[error("all {} endpoints failed; last error: {}", .0.len(), last_message(.0))]
    AllEndpointsFailed(Vec<RpcError>),
}

impl RpcError {
    /// Endpoint that produced this failure, if it is tied to one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Connection { endpoint, .. }
            | Self::Protocol { endpoint, .. }
            | Self::Server { endpoint, .. } => Some(endpoint),
            Self::NoEndpoints | Self::AllEndpointsFailed(_) => None,
        }
    }
}

fn last_message(errors: &[RpcError]) -> String {
    errors
        .last()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_owned())
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to spawn worker `{bin}`: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode worker input: {0}")]
    InvalidInput(#[source] serde_json::Error),

    /// Nonzero exit. Displays as the raw stderr text the worker produced.
    #[error("{stderr}")]
    ProcessExit { code: Option<i32>, stderr: String },

    #[error("worker result line is not valid JSON ({source}): {line}")]
    ResultParse {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}
