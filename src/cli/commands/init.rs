//! Initialize command.

use console::style;

use crate::config::Settings;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    if settings.validate().is_err() {
        println!(
            "{} No import source configured yet",
            style("!").yellow()
        );
        println!("  Set folder_path (local) or s3.bucket (s3) in jlingest.toml");
    }

    println!(
        "{} Initialized jlingest database at {}",
        style("✓").green(),
        settings.database_url()
    );

    Ok(())
}
