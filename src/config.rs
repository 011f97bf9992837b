use std::path::PathBuf;

use crate::logging::{FileLogSettings, LogRotation, LogSettings};

const APP_DIR: &str = "learner-style";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackendKind {
    Memory,
    Json,
    Sqlite,
}

impl StoreBackendKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "json" | "file" => Some(Self::Json),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    fn default_file_name(self) -> &'static str {
        match self {
            Self::Memory => "",
            Self::Json => "classification.json",
            Self::Sqlite => "classification.db",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackendKind,
    pub path: PathBuf,
    pub learner_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LogSettings,
    pub store: StoreConfig,
    pub item_bank_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let logging = log_settings(|key| std::env::var(key).ok());

        let learner_id = std::env::var("LEARNER_ID")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "default".to_string());

        let backend = std::env::var("STORE_BACKEND")
            .ok()
            .and_then(|value| StoreBackendKind::parse(&value))
            .unwrap_or(StoreBackendKind::Json);

        let path = std::env::var("STORE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_store_path(backend, &learner_id));

        let item_bank_path = std::env::var("ITEM_BANK_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Self {
            logging,
            store: StoreConfig {
                backend,
                path,
                learner_id,
            },
            item_bank_path,
        }
    }
}

/// `RUST_LOG`, plus `ENABLE_FILE_LOGS` / `LOG_DIR` / `LOG_ROTATION` for the file sink.
fn log_settings(var: impl Fn(&str) -> Option<String>) -> LogSettings {
    let filter = var("RUST_LOG")
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());

    let file_enabled = var("ENABLE_FILE_LOGS")
        .map(|value| value == "true" || value == "1")
        .unwrap_or(false);

    let file = file_enabled.then(|| FileLogSettings {
        dir: var("LOG_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| app_data_dir().join("logs")),
        rotation: var("LOG_ROTATION")
            .and_then(|value| LogRotation::parse(&value))
            .unwrap_or(LogRotation::Daily),
    });

    LogSettings { filter, file }
}

fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `<data_local_dir>/learner-style/<learner_id>/<file>`.
pub fn default_store_path(backend: StoreBackendKind, learner_id: &str) -> PathBuf {
    let base = app_data_dir();

    match backend {
        // One database holds every learner context.
        StoreBackendKind::Sqlite => base.join(backend.default_file_name()),
        _ => base.join(learner_id).join(backend.default_file_name()),
    }
}
