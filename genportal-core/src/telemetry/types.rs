/// One finished streaming session, success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTrace {
    /// Path of the endpoint the session talked to.
    pub endpoint: &'static str,
    /// Number of `Chunk` events delivered before the terminal event.
    pub chunks: u32,
    /// Decoded bytes accumulated over the session.
    pub bytes: u64,
    pub latency_ms: u32,
    /// `None` on `Complete`; otherwise the error kind tag.
    pub error_kind: Option<&'static str>,
}

/// One finished non-streaming generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTrace {
    pub endpoint: &'static str,
    pub latency_ms: u32,
    pub error_kind: Option<&'static str>,
}
