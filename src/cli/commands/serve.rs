//! Web server command.

use std::time::Duration;

use console::style;

use crate::cli::helpers::{build_importer, parse_bind_address};
use crate::config::Settings;
use crate::ingest::spawn_schedule;

/// Start the HTTP trigger, plus the timer trigger when enabled.
pub async fn cmd_serve(settings: &Settings, bind: &str, no_schedule: bool) -> anyhow::Result<()> {
    let addr = parse_bind_address(bind);

    println!("{} Preparing database...", style("→").cyan());
    let (_ctx, importer) = build_importer(settings).await?;
    println!("  {} Database ready", style("✓").green());

    let schedule = if settings.schedule.enabled && !no_schedule {
        println!(
            "{} Scheduled import every {}s from {}",
            style("→").cyan(),
            settings.schedule.interval_secs,
            importer.source().describe()
        );
        Some(spawn_schedule(
            importer.clone(),
            Duration::from_secs(settings.schedule.interval_secs),
        ))
    } else {
        None
    };

    println!("{} Starting jlingest server at http://{}", style("→").cyan(), addr);
    println!("  Press Ctrl+C to stop");

    let result = crate::server::serve(importer, &addr).await;
    if let Some(handle) = schedule {
        handle.abort();
    }
    result
}
