//! Logging setup
//!
//! Console logging always; JSON format plus a daily-rolling file when a log
//! directory is configured in production.

use std::fs;
use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system
///
/// `level` is the default filter when `RUST_LOG` is unset.
pub fn init(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_dir {
        Some(dir) => {
            let dir = Path::new(dir);
            fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "controller");

            if json_format {
                let console = fmt::layer().json().with_target(true);
                let file = fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::sync::Mutex::new(file_appender));
                registry.with(console).with(file).init();
            } else {
                let console = fmt::layer().with_target(true);
                let file = fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file_appender));
                registry.with(console).with(file).init();
            }
        }
        None => {
            if json_format {
                registry.with(fmt::layer().json().with_target(true)).init();
            } else {
                registry.with(fmt::layer().with_target(true)).init();
            }
        }
    }

    Ok(())
}
