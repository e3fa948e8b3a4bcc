//! Tracing subscriber setup.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Result, SheetError};

/// Name of the day's log file, e.g. `sheet_operations_20240131.log`
pub fn log_file_name(date: chrono::NaiveDate) -> String {
    format!("sheet_operations_{}.log", date.format("%Y%m%d"))
}

fn open_log_file(dir: &Path) -> Result<File> {
    fs::create_dir_all(dir).map_err(|e| {
        SheetError::Configuration(format!("Failed to create log directory {}: {}", dir.display(), e))
    })?;
    let path = dir.join(log_file_name(chrono::Local::now().date_naive()));
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| SheetError::Configuration(format!("Failed to open {}: {}", path.display(), e)))
}

/// Install the global subscriber: console output plus, when `log_dir` is
/// given, a daily file in that directory. `RUST_LOG` overrides the default
/// `info` level.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_dir {
        Some(dir) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(dir)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| SheetError::Configuration(format!("Failed to install logger: {}", e)))
}
