use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "learner-style.log";
const FALLBACK_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl LogRotation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "never" | "none" => Some(Self::Never),
            _ => None,
        }
    }

    fn rotation(self) -> Rotation {
        match self {
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
            Self::Never => Rotation::NEVER,
        }
    }
}

/// Where session and store events are written besides stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogSettings {
    pub dir: PathBuf,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `learner_style_engine=debug`.
    pub filter: String,
    pub file: Option<FileLogSettings>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: FALLBACK_FILTER.to_string(),
            file: None,
        }
    }
}

pub struct FileLogGuard {
    _guard: WorkerGuard,
}

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|err| {
        eprintln!("invalid log filter {directive:?} ({err}), using {FALLBACK_FILTER}");
        EnvFilter::new(FALLBACK_FILTER)
    })
}

fn file_appender(settings: &FileLogSettings) -> Option<RollingFileAppender> {
    match std::fs::create_dir_all(&settings.dir) {
        Ok(()) => Some(RollingFileAppender::new(
            settings.rotation.rotation(),
            &settings.dir,
            LOG_FILE_PREFIX,
        )),
        Err(err) => {
            eprintln!(
                "file logging disabled, cannot create {}: {err}",
                settings.dir.display()
            );
            None
        }
    }
}

/// Installs the global subscriber. Console output goes to stderr so stdout
/// stays free for the questionnaire and JSON snapshots.
pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let (file_layer, guard) = match settings.file.as_ref().and_then(file_appender) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(&settings.filter))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(file_layer)
        .init();

    guard
}
