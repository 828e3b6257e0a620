use std::io::Write;

use chrono::Local;
use log::LevelFilter;

/// Initializes the global logger.
///
/// Lines are prefixed with a local RFC 3339 timestamp and the level. `RUST_LOG`
/// overrides `level`. Calling this twice keeps the first logger.
pub fn init(level: LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();

    match result {
        Ok(()) => log::info!("Logging initialized at {}", level),
        Err(_) => log::debug!("Logger already initialized"),
    }
}
