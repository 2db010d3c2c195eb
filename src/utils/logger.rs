use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use chrono::Local;
use log::{warn, LevelFilter};
use crate::error::Result;

pub fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.trim().trim_matches('"').to_lowercase().as_str() {
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        "none" | "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// Install the global logger.
///
/// With a `log_dir` every record goes to a timestamped file in that directory
/// and the file path is returned; otherwise records go to stderr. When a
/// logger is already installed it stays in place and `None` is returned.
pub fn init_logging(level: LevelFilter, log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level);

    let log_path = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            let path = dir.join(format!("cmmd_{}.log", timestamp));
            let log_file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            builder.target(env_logger::Target::Pipe(Box::new(log_file)));
            Some(path)
        },
        None => None,
    };

    if let Err(e) = builder.try_init() {
        warn!("Keeping the logger that is already installed: {}", e);
        if let Some(path) = &log_path {
            fs::remove_file(path)?;
        }
        return Ok(None);
    }
    Ok(log_path)
}
