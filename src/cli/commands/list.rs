//! List claimable items.

use console::style;

use crate::cli::helpers::build_source;
use crate::config::Settings;

/// Show items the next run would pick up. Nothing is claimed.
pub async fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    settings.validate()?;
    let source = build_source(settings).await?;
    let items = source.list().await?;

    if items.is_empty() {
        println!("{} No new JL files in {}", style("!").yellow(), source.describe());
        return Ok(());
    }

    println!(
        "{} {} file(s) waiting in {}",
        style("→").cyan(),
        items.len(),
        source.describe()
    );
    for item in items {
        println!("  {}", item);
    }

    Ok(())
}
