//! A process-wide, swappable log sink for engine progress and diagnostics.
//!
//! This is deliberately not just calling the `log` crate directly: the
//! engine is meant to be embeddable in hosts that have their own progress
//! UI, so the sink is a small trait object behind a mutex that can be
//! replaced wholesale. The default sink forwards to `log` so a host that
//! already has `env_logger` (or any other `log`-compatible subscriber)
//! installed gets useful output for free.

use std::sync::{Arc, Mutex, OnceLock};

/// Severity of a single log line emitted by the engine.
///
/// Per spec: normal progress is `Verbose`, a dropped/mismatched attribute
/// at ingest is `Warning`, and an internal invariant failure is `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Verbose,
    Warning,
    Error,
}

/// A reentrancy-safe destination for engine log lines.
pub trait ProgressSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str);
}

struct DefaultSink;

impl ProgressSink for DefaultSink {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Verbose => log::debug!(target: "rmesh::simplify", "{message}"),
            Severity::Warning => log::warn!(target: "rmesh::simplify", "{message}"),
            Severity::Error => log::error!(target: "rmesh::simplify", "{message}"),
        }
    }
}

static SINK: OnceLock<Mutex<Arc<dyn ProgressSink>>> = OnceLock::new();

fn sink_slot() -> &'static Mutex<Arc<dyn ProgressSink>> {
    SINK.get_or_init(|| Mutex::new(Arc::new(DefaultSink)))
}

/// Replace the process-wide sink. Safe to call concurrently; replacement
/// is atomic under the mutex.
pub fn set_sink(sink: Arc<dyn ProgressSink>) {
    let mut guard = sink_slot().lock().unwrap();
    *guard = sink;
}

/// Restore the default `log`-backed sink.
pub fn reset_sink() {
    set_sink(Arc::new(DefaultSink));
}

/// Emit a log line through the current sink. Takes the mutex only long
/// enough to clone the `Arc`, then releases it before calling into
/// (potentially slow, potentially reentrant) sink code.
pub fn log(severity: Severity, message: impl AsRef<str>) {
    let sink = sink_slot().lock().unwrap().clone();
    sink.log(severity, message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink(Arc<AtomicUsize>);

    impl ProgressSink for CountingSink {
        fn log(&self, _severity: Severity, _message: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn replacing_sink_routes_subsequent_calls() {
        let count = Arc::new(AtomicUsize::new(0));
        set_sink(Arc::new(CountingSink(count.clone())));
        log(Severity::Verbose, "hello");
        log(Severity::Warning, "world");
        assert_eq!(count.load(Ordering::SeqCst), 2);
        reset_sink();
    }
}
