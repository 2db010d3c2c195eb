pub mod logger;

use std::time::Duration;

pub use self::logger::{init_logging, parse_log_level};

/// `N minutes, S.SS seconds`, the format stage timings are logged in.
pub fn format_elapsed(duration: Duration) -> String {
    let total = duration.as_secs_f64();
    let minutes = (total / 60.0).floor() as u64;
    let seconds = total - minutes as f64 * 60.0;
    format!("{} minutes, {:.2} seconds", minutes, seconds)
}
