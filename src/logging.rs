use fern::colors::{Color, ColoredLevelConfig};
use log::{info, LevelFilter};

use crate::error::{Error, Result};

pub fn parse_level(level: &str) -> Result<LevelFilter> {
    match level.to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        other => Err(Error::InvalidConfig(format!("unknown log level '{}'", other))),
    }
}

/// Install the global logger, writing to stderr so stdout stays free for
/// downloaded bytes.
pub fn setup_logging(level: &str) -> Result<()> {
    let level = parse_level(level)?;

    let colors = ColoredLevelConfig::new()
        .trace(Color::Cyan)
        .debug(Color::Magenta)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{:width$}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
                colors.color(record.level()),
                record.target(),
                message,
                width = 5
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| Error::InvalidConfig(format!("logger already installed: {}", e)))?;
    info!("logging initialized.");
    Ok(())
}
