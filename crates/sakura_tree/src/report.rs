//! Diagnostic output records.
//!
//! Every blossom completion produces one plain-text record: separator,
//! result label, the indented hierarchy path, an optional message, and a
//! closing separator. Records are written whole through a [`ReportSink`] so
//! concurrent workers never interleave lines.

use std::io::Write;

use parking_lot::Mutex;

use crate::item::{BlossomItem, ResultState};

/// Serialized sink for diagnostic records.
pub trait ReportSink: Send + Sync {
    /// Writes one whole record.
    fn record(&self, record: &str);
}

/// Writes records to standard output, one record at a time.
#[derive(Debug, Default)]
pub struct StdoutSink {
    lock: Mutex<()>,
}

impl StdoutSink {
    /// Creates a stdout sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for StdoutSink {
    fn record(&self, record: &str) {
        let _guard = self.lock.lock();
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(record.as_bytes());
        let _ = stdout.flush();
    }
}

/// Collects records in memory; used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of all records written so far.
    #[must_use]
    pub fn records(&self) -> Vec<String> {
        self.records.lock().clone()
    }
}

impl ReportSink for MemorySink {
    fn record(&self, record: &str) {
        self.records.lock().push(record.to_string());
    }
}

/// Renders the record for one blossom completion.
#[must_use]
pub fn format_blossom_record(item: &BlossomItem) -> String {
    let mut out = String::new();
    out.push_str("+++++++++++++++++++++++++++++++++++++++++++++++++\n");

    match item.result_state {
        ResultState::Undefined => out.push_str("UNDEFINED\n"),
        ResultState::Skipped => out.push_str("SKIPPED\n"),
        ResultState::Changed => out.push_str("CHANGED\n"),
        ResultState::ErrorInit => out.push_str("ERROR in init-state\n"),
        ResultState::ErrorPreCheck => out.push_str("ERROR in pre-check-state\n"),
        ResultState::ErrorExec => {
            out.push_str("ERROR in exec-state with error-code: ");
            out.push_str(&item.exec_state.to_string());
            out.push('\n');
        }
        ResultState::ErrorPostCheck => out.push_str("ERROR in post-check-state\n"),
        ResultState::ErrorClose => out.push_str("ERROR in close-state\n"),
    }

    for (depth, label) in item.name_hierarchy.iter().enumerate() {
        for _ in 0..depth {
            out.push_str("   ");
        }
        out.push_str(label);
        out.push('\n');
    }

    if !item.message.is_empty() {
        out.push('\n');
        out.push_str(&item.message);
        out.push('\n');
    }

    out.push_str("-------------------------------------------------\n\n");
    out
}
