//! The ingestion pipeline.
//!
//! Control flow for one run:
//!
//! ```text
//! Importer::run ── list ──> one task per item (bounded by a semaphore)
//!                              claim ─> read lines ─> parse_line
//!                                                      ─> ReferenceResolver
//!                                                      ─> BatchWriter
//!                              complete (or leave claimed on failure)
//! ```
//!
//! Failures are contained to the smallest unit: a bad line skips the line, a
//! bad record skips the record, an I/O error aborts only its file.

mod gate;
mod line;
mod resolver;
mod runner;
mod schedule;
mod store;
mod writer;

pub use gate::{RunGate, RunGuard};
pub use line::{parse_line, LineError, OverallEntry, ParsedLine, RequiredFields};
pub use resolver::ReferenceResolver;
pub use runner::{ImportOptions, Importer, TriggerOutcome};
pub use schedule::spawn_schedule;
pub use store::{ReferenceStore, ReviewStore, StoreError};
pub use writer::{BatchWriter, PendingReview, WriteOutcome};

use std::fmt;

/// Counters for one file or one whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Items this worker claimed.
    pub files_claimed: usize,
    /// Items moved to their processed name.
    pub files_completed: usize,
    /// Items claimed by someone else first.
    pub files_conflicted: usize,
    /// Items aborted and left in claimed state.
    pub files_failed: usize,
    /// Non-blank lines read.
    pub lines_read: usize,
    pub lines_malformed: usize,
    pub lines_missing_fields: usize,
    pub lines_invalid: usize,
    /// Lines dropped because a store call failed while staging them.
    pub lines_failed: usize,
    /// Lines whose review already existed.
    pub reviews_existing: usize,
    pub reviews_saved: usize,
    /// Reviews skipped during per-record fallback.
    pub reviews_failed: usize,
}

impl ImportStats {
    /// Merge stats from another instance.
    pub fn merge(&mut self, other: &ImportStats) {
        self.files_claimed += other.files_claimed;
        self.files_completed += other.files_completed;
        self.files_conflicted += other.files_conflicted;
        self.files_failed += other.files_failed;
        self.lines_read += other.lines_read;
        self.lines_malformed += other.lines_malformed;
        self.lines_missing_fields += other.lines_missing_fields;
        self.lines_invalid += other.lines_invalid;
        self.lines_failed += other.lines_failed;
        self.reviews_existing += other.reviews_existing;
        self.reviews_saved += other.reviews_saved;
        self.reviews_failed += other.reviews_failed;
    }

    /// Lines skipped for any reason other than an existing review.
    pub fn lines_skipped(&self) -> usize {
        self.lines_malformed + self.lines_missing_fields + self.lines_invalid + self.lines_failed
    }

    pub(crate) fn record(&mut self, outcome: WriteOutcome) {
        self.reviews_saved += outcome.saved;
        self.reviews_failed += outcome.failed;
    }
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "files: {} completed, {} failed, {} conflicted; lines: {} read, {} skipped; reviews: {} saved, {} existing, {} failed",
            self.files_completed,
            self.files_failed,
            self.files_conflicted,
            self.lines_read,
            self.lines_skipped(),
            self.reviews_saved,
            self.reviews_existing,
            self.reviews_failed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_counters() {
        let mut total = ImportStats {
            files_completed: 1,
            reviews_saved: 10,
            lines_malformed: 1,
            ..Default::default()
        };
        total.merge(&ImportStats {
            files_completed: 2,
            reviews_saved: 5,
            lines_invalid: 2,
            ..Default::default()
        });

        assert_eq!(total.files_completed, 3);
        assert_eq!(total.reviews_saved, 15);
        assert_eq!(total.lines_skipped(), 3);
    }
}
