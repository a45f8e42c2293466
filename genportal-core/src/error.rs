use thiserror::Error;

/// Core error type for the portal generation client.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
///
/// Streaming sessions never return these as `Err`: every failure inside a
/// session is normalized to a `StreamEvent::Failed` message. The variants
/// below are the typed form used by the JSON calls and the transport layer.
#[derive(Debug, Error)]
pub enum GenClientError {
    /// The request never produced a response (connect failure, DNS, timeout).
    #[error("{message}")]
    Transport { message: String },

    /// Non-success HTTP status. `message` is extracted best-effort from the
    /// JSON failure body (`detail` or `message` key) with a generic fallback.
    #[error("{message}")]
    Status { code: u16, message: String },

    /// The transport cannot provide incremental byte access to the body.
    #[error("streaming response bodies are not supported by this transport")]
    StreamingUnsupported,

    /// Failure while reading body segments after a successful response start.
    #[error("{message}")]
    StreamRead { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GenClientError {
    /// Short stable tag for telemetry; not part of the caller contract.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::StreamingUnsupported => "streaming_unsupported",
            Self::StreamRead { .. } => "stream_read",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, GenClientError>;
