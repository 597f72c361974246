//! Run orchestrator.
//!
//! A run lists the claimable items, processes each one in its own task with
//! at most `workers` tasks in flight, and waits for all of them. Lines
//! within a file are processed strictly in order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::gate::{RunGate, RunGuard};
use super::line::{parse_line, LineError, ParsedLine, RequiredFields};
use super::resolver::ReferenceResolver;
use super::store::{ReferenceStore, ReviewStore, StoreError};
use super::writer::{BatchWriter, PendingReview};
use super::ImportStats;
use crate::models::{OverallByProvider, Review, ReviewGrade};
use crate::source::{ClaimedItem, ImportSource, SourceError, SourceItem};

/// Tunables for a run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub workers: usize,
    pub required: RequiredFields,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            workers: 4,
            required: RequiredFields::default(),
        }
    }
}

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A run was started in the background.
    Accepted,
    /// A run is already in progress; nothing was started.
    Skipped,
}

/// Per-file worker state. Cheap to clone into tasks.
#[derive(Clone)]
struct FileWorker {
    source: Arc<dyn ImportSource>,
    resolver: Arc<ReferenceResolver>,
    reviews: Arc<dyn ReviewStore>,
    required: Arc<RequiredFields>,
    batch_size: usize,
}

/// Entry point shared by the CLI, HTTP and timer triggers.
#[derive(Clone)]
pub struct Importer {
    worker: FileWorker,
    workers: usize,
    gate: RunGate,
}

impl Importer {
    pub fn new(
        source: Arc<dyn ImportSource>,
        references: Arc<dyn ReferenceStore>,
        reviews: Arc<dyn ReviewStore>,
        options: ImportOptions,
    ) -> Self {
        Self {
            worker: FileWorker {
                source,
                resolver: Arc::new(ReferenceResolver::new(references)),
                reviews,
                required: Arc::new(options.required),
                batch_size: options.batch_size.max(1),
            },
            workers: options.workers.max(1),
            gate: RunGate::new(),
        }
    }

    pub fn gate(&self) -> &RunGate {
        &self.gate
    }

    pub fn source(&self) -> &Arc<dyn ImportSource> {
        &self.worker.source
    }

    /// Start a run in the background and return at once.
    pub fn trigger(&self) -> TriggerOutcome {
        let Some(guard) = self.start() else {
            return TriggerOutcome::Skipped;
        };
        let this = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            this.run().await;
        });
        TriggerOutcome::Accepted
    }

    /// Run to completion while holding the gate. `None` if a run was
    /// already in progress.
    pub async fn run_exclusive(&self) -> Option<ImportStats> {
        let _guard = self.start()?;
        Some(self.run().await)
    }

    fn start(&self) -> Option<RunGuard> {
        let guard = self.gate.try_start();
        if guard.is_none() {
            info!("Import already running, skipping this trigger");
        }
        guard
    }

    /// One full pass over the source. Callers hold the gate.
    async fn run(&self) -> ImportStats {
        let mut total = ImportStats::default();
        let source = self.worker.source.describe();

        let items = match self.worker.source.list().await {
            Ok(items) => items,
            Err(e) => {
                error!(source = %source, error = %e, "Failed to list import source");
                return total;
            }
        };
        if items.is_empty() {
            info!(source = %source, "No new JL files to process");
            return total;
        }
        info!(source = %source, files = items.len(), workers = self.workers, "Starting import run");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            let semaphore = semaphore.clone();
            let worker = self.worker.clone();
            handles.push(tokio::spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();
                worker.process(item).await
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(stats) => total.merge(&stats),
                Err(e) => error!(error = %e, "Import task failed"),
            }
        }

        info!(source = %source, "Import run finished: {}", total);
        total
    }
}

/// How a line was staged.
enum Staged {
    Pending(PendingReview),
    AlreadyExists,
}

impl FileWorker {
    #[tracing::instrument(name = "file", skip(self, item), fields(item = %item))]
    async fn process(&self, item: SourceItem) -> ImportStats {
        let mut stats = ImportStats::default();

        let claimed = match self.source.claim(&item).await {
            Ok(claimed) => claimed,
            Err(SourceError::AlreadyClaimed(_)) => {
                info!("Already claimed by another worker, skipping");
                stats.files_conflicted += 1;
                return stats;
            }
            Err(e) => {
                error!(error = %e, "Failed to claim item");
                stats.files_failed += 1;
                return stats;
            }
        };
        stats.files_claimed += 1;

        match self.import_lines(&claimed, &mut stats).await {
            Ok(()) => match self.source.complete(claimed).await {
                Ok(()) => stats.files_completed += 1,
                Err(e) => {
                    error!(error = %e, "Failed to mark item processed, it stays claimed");
                    stats.files_failed += 1;
                }
            },
            Err(e) => {
                error!(error = %e, "Aborting file");
                claimed.abandon();
                stats.files_failed += 1;
            }
        }

        info!("Finished file: {}", stats);
        stats
    }

    /// Read and import every line. Returns an error only when reading
    /// fails; whatever was staged before that is still committed.
    async fn import_lines(
        &self,
        claimed: &ClaimedItem,
        stats: &mut ImportStats,
    ) -> Result<(), SourceError> {
        let mut reader = self.source.read(claimed).await?;
        let mut writer = BatchWriter::new(self.reviews.clone(), self.batch_size);
        let mut line_no = 0usize;

        let result = loop {
            let line = match reader.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            stats.lines_read += 1;

            let Some(pending) = self.stage_line(&line, line_no, stats).await else {
                continue;
            };
            let outcome = writer.push(pending).await;
            stats.record(outcome);
        };

        stats.record(writer.flush().await);
        result
    }

    async fn stage_line(
        &self,
        line: &str,
        line_no: usize,
        stats: &mut ImportStats,
    ) -> Option<PendingReview> {
        let parsed = match parse_line(line, line_no, &self.required) {
            Ok(parsed) => parsed,
            Err(LineError::Malformed(e)) => {
                warn!(line = line_no, error = %e, "Skipping malformed line");
                stats.lines_malformed += 1;
                return None;
            }
            Err(LineError::MissingFields(fields)) => {
                warn!(
                    line = line_no,
                    missing = %fields.join(", "),
                    "Skipping line with missing required fields"
                );
                stats.lines_missing_fields += 1;
                return None;
            }
            Err(e @ LineError::Invalid(_)) => {
                warn!(line = line_no, error = %e, "Skipping invalid line");
                stats.lines_invalid += 1;
                return None;
            }
        };

        let review_id = parsed.review_id;
        match self.stage(parsed).await {
            Ok(Staged::Pending(pending)) => Some(pending),
            Ok(Staged::AlreadyExists) => {
                debug!(line = line_no, review_id, "Review already exists, skipping");
                stats.reviews_existing += 1;
                None
            }
            Err(e) => {
                error!(line = line_no, review_id, error = %e, "Skipping line after store error");
                stats.lines_failed += 1;
                None
            }
        }
    }

    /// Resolve reference data and build the rows for one review.
    async fn stage(&self, parsed: ParsedLine) -> Result<Staged, StoreError> {
        if self.reviews.review_exists(parsed.review_id).await? {
            return Ok(Staged::AlreadyExists);
        }

        let provider = self.resolver.provider(&parsed.provider).await?;
        let property = self.resolver.property(&parsed.property).await?;
        let reviewer = self.resolver.reviewer(&parsed.reviewer).await?;

        let mut grades = Vec::new();
        let mut overalls = Vec::with_capacity(parsed.overalls.len());
        for entry in parsed.overalls {
            let other = self.resolver.provider(&entry.provider).await?;
            overalls.push(OverallByProvider::new(
                parsed.review_id,
                other.id,
                entry.overall_score,
                entry.review_count,
            ));
            grades.extend(entry.grades.into_iter().map(|(category, score)| ReviewGrade {
                review_id: parsed.review_id,
                category,
                score,
            }));
        }

        Ok(Staged::Pending(PendingReview {
            review: Review::new(
                parsed.review_id,
                property.id,
                provider.id,
                reviewer.id,
                parsed.details,
            ),
            grades,
            overalls,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use crate::source::LocalDirSource;
    use std::path::Path;

    fn line(review_id: i64, hotel_id: i64, reviewer: &str) -> String {
        format!(
            r#"{{"hotelId":{hotel_id},"hotelName":"Hotel {hotel_id}","comment":{{"hotelReviewId":{review_id},"providerId":5,"reviewProviderText":"Expedia","rating":8.0,"reviewComments":"Fine","reviewDate":"2025-03-01T10:00:00+07:00","reviewerInfo":{{"displayMemberName":"{reviewer}","countryName":"TH"}}}},"overallByProviders":[{{"providerId":7,"provider":"Agoda","overallScore":8.4,"reviewCount":120,"grades":{{"Cleanliness":8.9,"Location":9.1}}}}]}}"#
        )
    }

    async fn setup(dir: &Path) -> (DbContext, Importer) {
        let ctx = DbContext::from_sqlite_path(&dir.join("reviews.db"));
        ctx.init_schema().await.unwrap();
        let store = Arc::new(ctx.store());
        let importer = Importer::new(
            Arc::new(LocalDirSource::new(dir.join("in"))),
            store.clone(),
            store,
            ImportOptions {
                batch_size: 2,
                ..Default::default()
            },
        );
        (ctx, importer)
    }

    #[tokio::test]
    async fn imports_file_and_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir(&input).unwrap();
        let body = [
            line(1, 10, "Ann"),
            String::new(),
            "{broken".to_string(),
            r#"{"hotelId":10}"#.to_string(),
            line(2, 10, "Ann"),
            line(3, 11, "Bob"),
        ]
        .join("\n");
        std::fs::write(input.join("batch.jl"), body).unwrap();

        let (ctx, importer) = setup(dir.path()).await;
        let stats = importer.run_exclusive().await.unwrap();

        assert_eq!(stats.files_completed, 1);
        assert_eq!(stats.lines_read, 5);
        assert_eq!(stats.lines_malformed, 1);
        assert_eq!(stats.lines_missing_fields, 1);
        assert_eq!(stats.reviews_saved, 3);
        assert!(input.join("batch_processed.jl").exists());
        assert!(!input.join("batch.jl").exists());

        assert_eq!(ctx.count_rows("reviews").await, 3);
        assert_eq!(ctx.count_rows("reviewers").await, 2);
        assert_eq!(ctx.count_where("review_grades", "review_id", 1).await, 2);
        assert_eq!(ctx.count_where("overall_by_providers", "review_id", 1).await, 1);
        assert!(ctx.providers().find_by_id(7).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_run_finds_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("a.jl"), line(1, 10, "Ann")).unwrap();

        let (_ctx, importer) = setup(dir.path()).await;
        importer.run_exclusive().await.unwrap();

        // Same review arrives again under a new file name.
        std::fs::write(input.join("b.jl"), line(1, 10, "Ann")).unwrap();
        let stats = importer.run_exclusive().await.unwrap();

        assert_eq!(stats.files_completed, 1);
        assert_eq!(stats.reviews_existing, 1);
        assert_eq!(stats.reviews_saved, 0);
    }

    #[tokio::test]
    async fn read_error_keeps_earlier_lines_and_leaves_file_claimed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir(&input).unwrap();
        let mut body = format!("{}\n", line(1, 10, "Ann")).into_bytes();
        body.extend_from_slice(&[0xff, 0xfe, b'\n']);
        body.extend_from_slice(line(2, 10, "Ann").as_bytes());
        std::fs::write(input.join("bad.jl"), body).unwrap();

        let (ctx, importer) = setup(dir.path()).await;
        let stats = importer.run_exclusive().await.unwrap();

        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_completed, 0);
        assert_eq!(ctx.count_rows("reviews").await, 1);
        assert!(input.join("bad_processed.jl.processing").exists());
        assert!(!input.join("bad_processed.jl").exists());
    }

    #[tokio::test]
    async fn failed_claim_rename_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("stuck.jl"), line(1, 10, "Ann")).unwrap();
        let blocker = input.join("stuck_processed.jl.processing");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), "").unwrap();

        let (ctx, importer) = setup(dir.path()).await;
        let stats = importer.run_exclusive().await.unwrap();

        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_conflicted, 0);
        assert_eq!(stats.files_claimed, 0);
        assert_eq!(ctx.count_rows("reviews").await, 0);
    }

    #[tokio::test]
    async fn run_refused_while_gate_is_held() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("in")).unwrap();
        let (_ctx, importer) = setup(dir.path()).await;

        let _held = importer.gate().try_start().unwrap();
        assert!(importer.run_exclusive().await.is_none());
        assert_eq!(importer.trigger(), TriggerOutcome::Skipped);
    }

    #[tokio::test]
    async fn missing_folder_is_an_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        let (_ctx, importer) = setup(dir.path()).await;

        let stats = importer.run_exclusive().await.unwrap();
        assert_eq!(stats, ImportStats::default());
        assert!(!importer.gate().is_running());
    }
}
