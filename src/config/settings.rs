//! Resolved application settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::{ImportOptions, RequiredFields};
use crate::repository::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "jlingest.db";

/// Default seconds between scheduled runs.
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Which backend supplies JL files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Local,
    S3,
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => Err(ConfigError::Invalid(format!(
                "unknown source '{other}' (expected 'local' or 's3')"
            ))),
        }
    }
}

/// S3 connection details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    /// Key prefix to list under. Empty lists the whole bucket.
    pub prefix: String,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    pub source: SourceKind,
    /// Directory scanned by the local source.
    pub folder_path: Option<PathBuf>,
    /// Scratch directory for object downloads. System temp dir if unset.
    pub temp_dir: Option<PathBuf>,
    pub s3: S3Settings,
    pub required_fields: RequiredFields,
    pub batch_size: usize,
    pub workers: usize,
    pub schedule: ScheduleSettings,
}

impl Default for Settings {
    fn default() -> Self {
        // ~/.local/share/jlingest, falling back to the current directory
        let data_dir = dirs::data_dir()
            .map(|d| d.join("jlingest"))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            source: SourceKind::Local,
            folder_path: None,
            temp_dir: None,
            s3: S3Settings {
                region: "us-east-1".to_string(),
                ..Default::default()
            },
            required_fields: RequiredFields::default(),
            batch_size: 50,
            workers: 4,
            schedule: ScheduleSettings::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if self.database_url.is_none() {
            std::fs::create_dir_all(&self.data_dir)?;
        }
        Ok(())
    }

    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            batch_size: self.batch_size,
            workers: self.workers,
            required: self.required_fields.clone(),
        }
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.schedule.enabled && self.schedule.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "schedule.interval_secs must be at least 1".into(),
            ));
        }
        match self.source {
            SourceKind::Local if self.folder_path.is_none() => Err(ConfigError::Invalid(
                "folder_path is required for the local source".into(),
            )),
            SourceKind::S3 if self.s3.bucket.trim().is_empty() => Err(ConfigError::Invalid(
                "s3.bucket is required for the s3 source".into(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> Settings {
        Settings {
            folder_path: Some(PathBuf::from("/data/in")),
            ..Settings::with_data_dir(PathBuf::from("/data"))
        }
    }

    #[test]
    fn database_url_from_data_dir() {
        let settings = local();
        assert_eq!(settings.database_url(), "sqlite:/data/jlingest.db");

        let explicit = Settings {
            database_url: Some("sqlite:/tmp/x.db".into()),
            ..local()
        };
        assert_eq!(explicit.database_url(), "sqlite:/tmp/x.db");
    }

    #[test]
    fn validate_rejects_unusable_settings() {
        assert!(local().validate().is_ok());

        let no_folder = Settings {
            folder_path: None,
            ..local()
        };
        assert!(no_folder.validate().is_err());

        let zero_batch = Settings {
            batch_size: 0,
            ..local()
        };
        assert!(zero_batch.validate().is_err());

        let zero_workers = Settings {
            workers: 0,
            ..local()
        };
        assert!(zero_workers.validate().is_err());

        let s3_without_bucket = Settings {
            source: SourceKind::S3,
            ..local()
        };
        assert!(s3_without_bucket.validate().is_err());
    }

    #[test]
    fn source_kind_parses_case_insensitively() {
        assert_eq!("S3".parse::<SourceKind>().unwrap(), SourceKind::S3);
        assert_eq!(" local ".parse::<SourceKind>().unwrap(), SourceKind::Local);
        assert!("ftp".parse::<SourceKind>().is_err());
    }
}
