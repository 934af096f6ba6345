//! Logging module.

use colored::*;
use log::{Level, Log, Metadata, Record, SetLoggerError};

struct Logger {
    level: Level,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("{} {}", record.target().bold(), record.args());
            let message = match record.level() {
                Level::Error => message.as_str().red(),
                Level::Warn => message.as_str().yellow(),
                Level::Info => message.as_str().normal(),
                Level::Debug => message.as_str().dimmed(),
                Level::Trace => message.as_str().white().dimmed(),
            };
            eprintln!("{message}");
        }
    }

    fn flush(&self) {}
}

/// Initialize a new logger at the given level, writing to stderr.
pub fn init(level: Level) -> Result<(), SetLoggerError> {
    let logger = Logger { level };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level.to_level_filter());

    Ok(())
}
