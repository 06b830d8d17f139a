use parking_lot::Mutex;

use crate::{LogSink, Verbosity};

/// Forwards error log lines to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, verbosity: Verbosity, text: &str) {
        match verbosity {
            Verbosity::Fatal | Verbosity::Assert => tracing::error!(?verbosity, "{text}"),
            Verbosity::Warning => tracing::warn!(?verbosity, "{text}"),
            Verbosity::Message => tracing::info!(?verbosity, "{text}"),
            Verbosity::Debug => tracing::debug!(?verbosity, "{text}"),
        }
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Verbosity, String)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn lines(&self) -> Vec<(Verbosity, String)> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize { self.lines.lock().len() }

    pub fn is_empty(&self) -> bool { self.lines.lock().is_empty() }

    pub fn clear(&self) { self.lines.lock().clear() }
}

impl LogSink for MemorySink {
    fn log(&self, verbosity: Verbosity, text: &str) {
        self.lines.lock().push((verbosity, text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.log(Verbosity::Warning, "first");
        sink.log(Verbosity::Debug, "second");
        assert_eq!(
            sink.lines(),
            vec![(Verbosity::Warning, "first".to_string()), (Verbosity::Debug, "second".to_string())]
        );
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn tracing_sink_accepts_every_level() {
        // no subscriber installed; must not panic
        for v in [Verbosity::Fatal, Verbosity::Warning, Verbosity::Message, Verbosity::Assert, Verbosity::Debug] {
            TracingSink.log(v, "line");
        }
    }
}
