//! Uniform warning channel for extractors (§2 component 9, §5 "writer-shared resource").
//!
//! Grounded on the teacher's `tracing::warn!` call sites, generalized into a
//! structured sink that both logs (teacher behavior) and accumulates a
//! `Vec<Diagnostic>` the assembler can thread into `metadata` or a
//! side-channel stream, since downstream consumers need the list, not just
//! a log line.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Diagnostic {
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code: code.into(),
            message: message.into(),
            file_path: None,
            line: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            file_path: None,
            line: None,
        }
    }

    pub fn at(mut self, file_path: impl Into<String>, line: u32) -> Self {
        self.file_path = Some(file_path.into());
        self.line = Some(line);
        self
    }
}

/// Concurrent-append diagnostics sink (§5: "must accept concurrent appends").
///
/// Initialized at the start of a run and flushed at the end, per §9's
/// "global state" note — not a singleton, passed explicitly and shared via
/// `Arc` across extraction workers.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    items: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(
                code = %diagnostic.code,
                file = diagnostic.file_path.as_deref().unwrap_or(""),
                "{}",
                diagnostic.message
            ),
            Severity::Error => tracing::error!(
                code = %diagnostic.code,
                file = diagnostic.file_path.as_deref().unwrap_or(""),
                "{}",
                diagnostic.message
            ),
        }
        self.items
            .lock()
            .expect("diagnostics sink mutex poisoned")
            .push(diagnostic);
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for d in diagnostics {
            self.push(d);
        }
    }

    /// Drain all accumulated diagnostics, leaving the sink empty.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.items.lock().expect("diagnostics sink mutex poisoned"))
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("diagnostics sink mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_appends_are_all_recorded() {
        use std::sync::Arc;
        use std::thread;

        let sink = Arc::new(DiagnosticSink::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let sink = Arc::clone(&sink);
            handles.push(thread::spawn(move || {
                sink.push(Diagnostic::warning("test", format!("warning {i}")));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.len(), 8);
    }

    #[test]
    fn drain_empties_the_sink() {
        let sink = DiagnosticSink::new();
        sink.push(Diagnostic::warning("w", "first"));
        let drained = sink.drain();
        assert_eq!(drained.len(), 1);
        assert!(sink.is_empty());
    }
}
