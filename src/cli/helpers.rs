//! Shared helper functions for CLI commands.

use std::sync::Arc;

use crate::config::{Settings, SourceKind};
use crate::ingest::Importer;
use crate::repository::DbContext;
use crate::source::{ImportSource, LocalDirSource, ObjectStoreSource, S3ObjectStore};

/// Build the configured import source.
pub async fn build_source(settings: &Settings) -> anyhow::Result<Arc<dyn ImportSource>> {
    match settings.source {
        SourceKind::Local => {
            let folder = settings
                .folder_path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("folder_path is not configured"))?;
            Ok(Arc::new(LocalDirSource::new(folder)))
        }
        SourceKind::S3 => {
            let store = S3ObjectStore::new(&settings.s3).await;
            Ok(Arc::new(
                ObjectStoreSource::new(Arc::new(store), settings.s3.prefix.clone())
                    .with_temp_dir(settings.temp_dir.clone()),
            ))
        }
    }
}

/// Validate settings, open the database and wire up an importer.
pub async fn build_importer(settings: &Settings) -> anyhow::Result<(DbContext, Importer)> {
    settings.validate()?;
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let store = Arc::new(ctx.store());
    let importer = Importer::new(
        build_source(settings).await?,
        store.clone(),
        store,
        settings.import_options(),
    );
    Ok((ctx, importer))
}

/// Parse a bind address that can be:
/// - Just a port: "3030" -> 127.0.0.1:3030
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3030
/// - Host and port: "0.0.0.0:3030" -> 0.0.0.0:3030
pub fn parse_bind_address(bind: &str) -> String {
    if let Ok(port) = bind.parse::<u16>() {
        return format!("127.0.0.1:{port}");
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if port_str.parse::<u16>().is_ok() {
            return format!("{host}:{port_str}");
        }
    }

    format!("{bind}:3030")
}
