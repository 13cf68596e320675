use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where and under which name the rolling log files are written.
#[derive(Debug, Clone)]
pub struct LogFiles {
    pub directory: PathBuf,
    pub prefix: String,
    pub max_files: usize,
}

impl Default for LogFiles {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            prefix: "zalign".to_string(),
            max_files: 5,
        }
    }
}

impl LogFiles {
    pub fn in_directory(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

/// Console + daily rolling file logging. `RUST_LOG` overrides `base_level`.
pub fn setup_logging(base_level: &str) {
    setup_logging_with(base_level, &LogFiles::default());
}

pub fn setup_logging_with(base_level: &str, files: &LogFiles) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .unwrap_or_else(|e| panic!("Invalid log filter: {}", e));

    std::fs::create_dir_all(&files.directory).unwrap_or_else(|e| {
        panic!(
            "Failed to create log directory {}: {}",
            files.directory.display(),
            e
        )
    });

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(&files.prefix)
        .filename_suffix("log")
        .max_log_files(files.max_files)
        .build(&files.directory)
        .unwrap_or_else(|e| panic!("Failed to create log file appender: {}", e));

    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).expect("Logging already initialized");

    let console_writer = std::io::stdout.and(std::io::stderr.with_min_level(Level::WARN));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(true)
        .with_writer(console_writer);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .unwrap_or_else(|e| panic!("Logger initialization failed: {}", e));
}
