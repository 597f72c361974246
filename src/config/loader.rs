//! Settings resolution: file, then environment.

use std::path::PathBuf;

use super::{Config, ConfigError, Settings, SourceKind};

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

/// Load the config file and resolve it into settings.
///
/// An explicit `--config` path that cannot be read is an error; a missing
/// discovered file is not.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };
    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd
    } else {
        config.base_dir().unwrap_or(cwd)
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;

    Ok((settings, config))
}

/// Apply environment overrides. `lookup` returns a variable's value; empty
/// values are ignored.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = var("DATABASE_URL") {
        tracing::debug!("Using DATABASE_URL from environment: {}", url);
        settings.database_url = Some(url);
    }
    if let Some(source) = var("JLINGEST_SOURCE") {
        settings.source = source.parse::<SourceKind>()?;
    }
    if let Some(folder) = var("JLINGEST_FOLDER_PATH") {
        settings.folder_path = Some(PathBuf::from(shellexpand::tilde(&folder).as_ref()));
    }
    if let Some(workers) = var("JLINGEST_WORKERS") {
        settings.workers = parse_count("JLINGEST_WORKERS", &workers)?;
    }
    if let Some(batch_size) = var("JLINGEST_BATCH_SIZE") {
        settings.batch_size = parse_count("JLINGEST_BATCH_SIZE", &batch_size)?;
    }
    if let Some(key) = var("AWS_ACCESS_KEY_ID") {
        settings.s3.access_key = Some(key);
    }
    if let Some(secret) = var("AWS_SECRET_ACCESS_KEY") {
        settings.s3.secret_key = Some(secret);
    }
    if let Some(region) = var("AWS_REGION") {
        settings.s3.region = region;
    }
    Ok(())
}

fn parse_count(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} must be a whole number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn env_overrides_file_values() {
        let vars = env(&[
            ("DATABASE_URL", "sqlite:/tmp/env.db"),
            ("JLINGEST_SOURCE", "s3"),
            ("JLINGEST_WORKERS", "12"),
            ("AWS_REGION", "eu-west-1"),
            ("JLINGEST_BATCH_SIZE", ""),
        ]);
        let mut settings = Settings {
            batch_size: 7,
            ..Default::default()
        };

        apply_env_overrides(&mut settings, |k| vars.get(k).cloned()).unwrap();

        assert_eq!(settings.database_url(), "sqlite:/tmp/env.db");
        assert_eq!(settings.source, SourceKind::S3);
        assert_eq!(settings.workers, 12);
        assert_eq!(settings.s3.region, "eu-west-1");
        // Empty values are ignored.
        assert_eq!(settings.batch_size, 7);
    }

    #[test]
    fn bad_env_values_are_errors() {
        let vars = env(&[("JLINGEST_WORKERS", "lots")]);
        let mut settings = Settings::default();
        assert!(apply_env_overrides(&mut settings, |k| vars.get(k).cloned()).is_err());
    }

    #[tokio::test]
    async fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = LoadOptions {
            config_path: Some(dir.path().join("nope.toml")),
            use_cwd: false,
        };
        assert!(matches!(
            load_settings_with_options(options).await,
            Err(ConfigError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn explicit_config_resolves_relative_to_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jlingest.yaml");
        std::fs::write(&path, "folder_path: incoming\ndata_dir: .\n").unwrap();

        let (settings, _) = load_settings_with_options(LoadOptions {
            config_path: Some(path),
            use_cwd: false,
        })
        .await
        .unwrap();

        assert_eq!(settings.folder_path, Some(dir.path().join("incoming")));
        assert_eq!(settings.data_dir, dir.path().join("."));
    }
}
