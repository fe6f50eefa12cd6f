use crate::error::{EtlError, Result};
use lakehouse_core::TransformSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "lakehouse.yaml";

/// ETL configuration loaded from YAML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub storage: StorageSettings,
    pub log: LogSettings,
    pub ingest: IngestSettings,
    pub transform: TransformSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per document under `data_dir/<layer>/`
    #[default]
    File,
    Sqlite,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::File => f.write_str("file"),
            StorageBackend::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(EtlError::Config(format!("unknown storage backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub documents_db: String,
    pub run_log_db: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub batches: usize,
    pub batch_size: usize,
    /// Fixed seed for reproducible batches; entropy when absent
    pub seed: Option<u64>,
    pub include_ssn: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: PathBuf::from("data"),
            documents_db: "layers.sqlite".to_string(),
            run_log_db: "runs.sqlite".to_string(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batches: 5,
            batch_size: 50,
            seed: None,
            include_ssn: true,
        }
    }
}

impl EtlConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EtlError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&content)
            .map_err(|e| EtlError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Load configuration with priority: env vars > config file > defaults
    ///
    /// Without an explicit path, `lakehouse.yaml` is used when it exists.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override settings from `LAKEHOUSE_*` variables found through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_dir) = lookup("LAKEHOUSE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Some(level) = lookup("LAKEHOUSE_LOG_LEVEL") {
            self.log.level = level;
        }

        if let Some(seed) = lookup("LAKEHOUSE_SEED") {
            let seed = seed
                .parse()
                .map_err(|_| EtlError::Config(format!("LAKEHOUSE_SEED is not a u64: {}", seed)))?;
            self.ingest.seed = Some(seed);
        }

        if let Some(backend) = lookup("LAKEHOUSE_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }

        Ok(())
    }

    /// Get the full path to the layer documents database
    pub fn documents_db_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.documents_db)
    }

    /// Get the full path to the run log database
    pub fn run_log_db_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.run_log_db)
    }
}
