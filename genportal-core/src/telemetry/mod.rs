//! Telemetry primitives for the generation client.
//! By default, nothing is emitted unless a sink is installed via `set_telemetry_sink`.

pub mod keys;
pub mod types;

pub use keys::*;
pub use types::*;

use std::sync::Arc;

use once_cell::sync::OnceCell;

/// Implement this to receive telemetry events.
///
/// Requirements:
/// - Implementations must be thread-safe (`Send + Sync`) and `'static`.
/// - `record_session` / `record_call` may fire from any thread; implementations
///   should avoid panicking.
/// - Keep overhead minimal; session records fire on hot streaming paths.
pub trait TelemetrySink: Send + Sync + 'static {
    fn record_session(&self, trace: SessionTrace);

    fn record_call(&self, _trace: CallTrace) {}
}

static TELEMETRY_SINK: OnceCell<Arc<dyn TelemetrySink>> = OnceCell::new();

// In tests, gate emission to only the calling test thread to avoid cross-test interference.
#[cfg(test)]
thread_local! {
    static TEST_CAPTURE: std::cell::Cell<bool> = std::cell::Cell::new(false);
}

/// Install a global telemetry sink. Returns `false` if a sink is already installed.
///
/// This is a write-once global for the process lifetime (backed by `OnceCell`).
pub fn set_telemetry_sink(sink: Arc<dyn TelemetrySink>) -> bool {
    TELEMETRY_SINK.set(sink).is_ok()
}

/// Emit a session record if a sink is installed. Crate-visible only.
#[inline]
pub(crate) fn emit_session(trace: SessionTrace) {
    #[cfg(test)]
    {
        if !TEST_CAPTURE.with(|c| c.get()) {
            return;
        }
    }
    if let Some(sink) = TELEMETRY_SINK.get() {
        sink.record_session(trace);
    }
}

/// Emit a non-streaming call record if a sink is installed.
#[inline]
pub(crate) fn emit_call(trace: CallTrace) {
    #[cfg(test)]
    {
        if !TEST_CAPTURE.with(|c| c.get()) {
            return;
        }
    }
    if let Some(sink) = TELEMETRY_SINK.get() {
        sink.record_call(trace);
    }
}

#[cfg(test)]
/// Test-only helper: enable or disable capture for the current test thread.
pub fn test_set_capture_enabled(enabled: bool) {
    TEST_CAPTURE.with(|c| c.set(enabled));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CaptureSink {
        sessions: Mutex<Vec<SessionTrace>>,
        calls: Mutex<Vec<CallTrace>>,
    }

    impl TelemetrySink for CaptureSink {
        fn record_session(&self, trace: SessionTrace) {
            self.sessions.lock().unwrap().push(trace);
        }
        fn record_call(&self, trace: CallTrace) {
            self.calls.lock().unwrap().push(trace);
        }
    }

    #[test]
    fn sink_is_write_once_and_receives_records() {
        let sink = Arc::new(CaptureSink::default());
        assert!(set_telemetry_sink(sink.clone()));
        assert!(!set_telemetry_sink(Arc::new(CaptureSink::default())));

        test_set_capture_enabled(true);
        emit_session(SessionTrace {
            endpoint: "/generation/dialogue/stream",
            chunks: 1,
            bytes: 2,
            latency_ms: 3,
            error_kind: None,
        });
        emit_call(CallTrace {
            endpoint: "/generation/news",
            latency_ms: 4,
            error_kind: Some("status"),
        });
        test_set_capture_enabled(false);

        assert_eq!(sink.sessions.lock().unwrap().len(), 1);
        assert_eq!(sink.calls.lock().unwrap().len(), 1);
        assert_eq!(
            sink.calls.lock().unwrap()[0].error_kind,
            Some("status")
        );
    }

    #[test]
    fn emission_is_noop_without_capture() {
        emit_session(SessionTrace {
            endpoint: "/generation/dialogue/stream",
            chunks: 0,
            bytes: 0,
            latency_ms: 0,
            error_kind: Some("transport"),
        });
    }
}
