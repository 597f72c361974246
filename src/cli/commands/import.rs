//! One-shot import command.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::helpers::build_importer;
use crate::config::Settings;

/// Run one import and wait for it to finish.
pub async fn cmd_import(settings: &Settings) -> anyhow::Result<()> {
    let (_ctx, importer) = build_importer(settings).await?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map_err(|e| anyhow::anyhow!("invalid progress template: {e}"))?,
    );
    spinner.set_message(format!("Importing from {}", importer.source().describe()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let stats = importer.run_exclusive().await;
    spinner.finish_and_clear();

    let Some(stats) = stats else {
        println!("{} An import is already running", style("!").yellow());
        return Ok(());
    };

    println!(
        "{} Import finished: {} file(s) completed, {} review(s) saved",
        style("✓").green(),
        stats.files_completed,
        stats.reviews_saved
    );
    if stats.reviews_existing > 0 {
        println!("  {} already present", stats.reviews_existing);
    }
    if stats.lines_skipped() > 0 {
        println!(
            "  {} {} line(s) skipped (see log for details)",
            style("!").yellow(),
            stats.lines_skipped()
        );
    }
    if stats.files_failed > 0 || stats.reviews_failed > 0 {
        println!(
            "  {} {} file(s) left claimed, {} review(s) failed",
            style("✗").red(),
            stats.files_failed,
            stats.reviews_failed
        );
    }

    Ok(())
}
