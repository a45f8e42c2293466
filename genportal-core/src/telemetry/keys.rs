/// Span/Log attribute keys for generation calls.
/// Keep these stable; changing them is a breaking change for dashboards.
pub const KEY_ENDPOINT: &str = "gen.endpoint";
pub const KEY_LATENCY_MS: &str = "latency.ms";

pub const KEY_SESSION_CHUNKS: &str = "session.chunks";
pub const KEY_SESSION_BYTES: &str = "session.bytes";

/// Error-related (if applicable)
pub const KEY_ERROR_KIND: &str = "error.kind";
pub const KEY_ERROR_MESSAGE: &str = "error.message";
