//! Periodic trigger.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::runner::{Importer, TriggerOutcome};

/// Trigger an import every `every`, starting immediately.
///
/// Ticks that land while a run is still going are skipped by the run gate,
/// so slow runs never pile up. Abort the handle to stop the schedule.
pub fn spawn_schedule(importer: Importer, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = every.as_secs(), "Import schedule started");
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match importer.trigger() {
                TriggerOutcome::Accepted => debug!("Scheduled import started"),
                TriggerOutcome::Skipped => debug!("Scheduled import skipped, previous run still active"),
            }
        }
    })
}
