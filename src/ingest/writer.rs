//! Batch writer with per-record fallback.
//!
//! Reviews accumulate until the batch is full and are then committed in one
//! transaction. If that fails for any reason the batch is replayed one review
//! at a time: a review that fails is skipped along with its dependents, and
//! the rest still land.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::store::ReviewStore;
use crate::models::{OverallByProvider, Review, ReviewGrade};

/// A review with the rows that depend on it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReview {
    pub review: Review,
    pub grades: Vec<ReviewGrade>,
    pub overalls: Vec<OverallByProvider>,
}

/// Result of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub saved: usize,
    pub failed: usize,
    /// The bulk commit failed and records were written one by one.
    pub fell_back: bool,
}

pub struct BatchWriter {
    store: Arc<dyn ReviewStore>,
    batch_size: usize,
    pending: Vec<PendingReview>,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn ReviewStore>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            batch_size,
            pending: Vec::with_capacity(batch_size),
        }
    }

    /// Queue a review, flushing when the batch is full.
    pub async fn push(&mut self, review: PendingReview) -> WriteOutcome {
        self.pending.push(review);
        if self.pending.len() >= self.batch_size {
            self.flush().await
        } else {
            WriteOutcome::default()
        }
    }

    /// Commit everything queued. A no-op when nothing is queued.
    pub async fn flush(&mut self) -> WriteOutcome {
        if self.pending.is_empty() {
            return WriteOutcome::default();
        }
        let batch = std::mem::take(&mut self.pending);

        let reviews: Vec<Review> = batch.iter().map(|p| p.review.clone()).collect();
        let grades: Vec<ReviewGrade> = batch.iter().flat_map(|p| p.grades.clone()).collect();
        let overalls: Vec<OverallByProvider> =
            batch.iter().flat_map(|p| p.overalls.clone()).collect();

        match self.store.save_all(&reviews, &grades, &overalls).await {
            Ok(()) => {
                debug!(reviews = reviews.len(), grades = grades.len(), "Committed batch");
                WriteOutcome {
                    saved: reviews.len(),
                    failed: 0,
                    fell_back: false,
                }
            }
            Err(e) => {
                warn!(
                    reviews = reviews.len(),
                    error = %e,
                    "Batch commit failed, retrying records individually"
                );
                self.save_individually(&batch).await
            }
        }
    }

    async fn save_individually(&self, batch: &[PendingReview]) -> WriteOutcome {
        let mut outcome = WriteOutcome {
            fell_back: true,
            ..Default::default()
        };

        for pending in batch {
            let review_id = pending.review.id;
            if let Err(e) = self.store.save_review(&pending.review).await {
                error!(review_id, error = %e, "Failed to save review, skipping it and its dependents");
                outcome.failed += 1;
                continue;
            }
            outcome.saved += 1;

            for grade in &pending.grades {
                if let Err(e) = self.store.save_grade(grade).await {
                    error!(review_id, category = %grade.category, error = %e, "Failed to save review grade");
                }
            }
            for overall in &pending.overalls {
                if let Err(e) = self.store.save_overall(overall).await {
                    error!(
                        review_id,
                        provider_id = overall.provider_id,
                        error = %e,
                        "Failed to save overall-by-provider row"
                    );
                }
            }
        }

        outcome
    }
}
