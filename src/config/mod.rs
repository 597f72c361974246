//! Configuration management for jlingest using the prefer crate.
//!
//! Precedence, lowest to highest: built-in defaults, the config file,
//! environment variables. Relative paths in the file resolve against the
//! file's directory, or the working directory with `--cwd`.

mod loader;
mod settings;

pub use loader::{apply_env_overrides, load_settings_with_options, LoadOptions};
pub use settings::{
    ConfigError, S3Settings, ScheduleSettings, Settings, SourceKind, DEFAULT_DATABASE_FILENAME,
    DEFAULT_INTERVAL_SECS,
};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ingest::RequiredFields;

/// S3 section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: Option<bool>,
    pub interval_secs: Option<u64>,
}

/// Configuration file contents. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database filename or `sqlite:` URL.
    pub database: Option<String>,
    /// Data directory; the database file lives here.
    pub data_dir: Option<String>,
    pub required_fields: Option<RequiredFields>,
    pub batch_size: Option<usize>,
    pub workers: Option<usize>,
    pub source: Option<SourceKind>,
    pub folder_path: Option<String>,
    pub temp_dir: Option<String>,
    pub s3: S3Config,
    pub schedule: ScheduleConfig,
    /// File this config was read from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a `jlingest` config file in the standard locations.
    /// Falls back to defaults when none is found or it cannot be read.
    pub async fn load() -> Self {
        let Ok(discovered) = prefer::load("jlingest").await else {
            return Self::default();
        };
        let Some(path) = discovered.source_path() else {
            return Self::default();
        };
        match Self::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// TOML and YAML by extension, JSON otherwise.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// The config file's directory, if loaded from a file.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Expand `~` and resolve relative paths against `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            if database.starts_with("sqlite:") {
                settings.database_url = Some(database.clone());
            } else {
                settings.database_filename = database.clone();
            }
        }
        if let Some(ref required) = self.required_fields {
            settings.required_fields = required.clone();
        }
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = batch_size;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(source) = self.source {
            settings.source = source;
        }
        if let Some(ref folder) = self.folder_path {
            settings.folder_path = Some(self.resolve_path(folder, base_dir));
        }
        if let Some(ref temp_dir) = self.temp_dir {
            settings.temp_dir = Some(self.resolve_path(temp_dir, base_dir));
        }

        let s3 = &self.s3;
        if let Some(ref bucket) = s3.bucket {
            settings.s3.bucket = bucket.clone();
        }
        if let Some(ref prefix) = s3.prefix {
            settings.s3.prefix = prefix.clone();
        }
        if let Some(ref region) = s3.region {
            settings.s3.region = region.clone();
        }
        if s3.access_key.is_some() {
            settings.s3.access_key = s3.access_key.clone();
        }
        if s3.secret_key.is_some() {
            settings.s3.secret_key = s3.secret_key.clone();
        }
        if s3.endpoint.is_some() {
            settings.s3.endpoint = s3.endpoint.clone();
        }

        if let Some(enabled) = self.schedule.enabled {
            settings.schedule.enabled = enabled;
        }
        if let Some(interval) = self.schedule.interval_secs {
            settings.schedule.interval_secs = interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml() {
        let config = Config::parse(
            r#"
            database = "reviews.db"
            folder_path = "incoming"
            workers = 8
            source = "s3"

            [s3]
            bucket = "exports"
            prefix = "reviews/"

            [schedule]
            interval_secs = 60

            [required_fields]
            top_level = ["hotelId"]
            "#,
            "toml",
        )
        .unwrap();

        assert_eq!(config.workers, Some(8));
        assert_eq!(config.source, Some(SourceKind::S3));
        assert_eq!(config.s3.bucket.as_deref(), Some("exports"));
        assert_eq!(config.schedule.interval_secs, Some(60));
        let required = config.required_fields.unwrap();
        assert_eq!(required.top_level, vec!["hotelId"]);
        // Unspecified list keeps its default.
        assert_eq!(required.comment, RequiredFields::default().comment);
    }

    #[test]
    fn parses_yaml_and_json() {
        let yaml = Config::parse("batch_size: 10\nschedule:\n  enabled: false\n", "yml").unwrap();
        assert_eq!(yaml.batch_size, Some(10));
        assert_eq!(yaml.schedule.enabled, Some(false));

        let json = Config::parse(r#"{"folder_path": "/in"}"#, "json").unwrap();
        assert_eq!(json.folder_path.as_deref(), Some("/in"));

        assert!(Config::parse("{", "json").is_err());
    }

    #[test]
    fn relative_paths_resolve_against_base_dir() {
        let config = Config {
            data_dir: Some("data".into()),
            folder_path: Some("/abs/in".into()),
            database: Some("sqlite:/tmp/other.db".into()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/etc/jlingest"));

        assert_eq!(settings.data_dir, PathBuf::from("/etc/jlingest/data"));
        assert_eq!(settings.folder_path, Some(PathBuf::from("/abs/in")));
        assert_eq!(settings.database_url(), "sqlite:/tmp/other.db");
    }

    #[tokio::test]
    async fn load_from_path_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jlingest.toml");
        std::fs::write(&path, "workers = 2\n").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.base_dir(), Some(dir.path().to_path_buf()));
    }
}
