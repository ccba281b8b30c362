//! Logging for shadergen.
//!
//! Routes every `log::info!()` etc. through a single process logger that
//! writes `[timestamp] [LEVEL] [target] message` lines to stderr and,
//! optionally, to a log file.
//!
//! Level precedence: `--log-level` flag, then `RUST_LOG` (a bare level name),
//! then the config file `log_level`, then `info`.

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

/// Logger state shared by all threads.
struct LogSink {
    file: Option<std::fs::File>,
}

impl LogSink {
    fn write_line(&mut self, line: &str) {
        let _ = std::io::stderr().write_all(line.as_bytes());
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }
}

struct LogBridge {
    sink: Mutex<LogSink>,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        self.sink.lock().write_line(&line);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(ref mut file) = self.sink.lock().file {
            let _ = file.flush();
        }
    }
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

/// Parse a level name such as `debug` or `WARN`.
pub fn parse_level(name: &str) -> Option<log::LevelFilter> {
    name.trim().parse::<log::LevelFilter>().ok()
}

/// Level from `RUST_LOG`, when it holds a bare level name.
pub fn env_level() -> Option<log::LevelFilter> {
    std::env::var("RUST_LOG").ok().as_deref().and_then(parse_level)
}

/// Resolve the effective level from the CLI flag, `RUST_LOG` and config.
pub fn resolve_level(
    cli_level: Option<log::LevelFilter>,
    config_level: Option<&str>,
) -> log::LevelFilter {
    cli_level
        .or_else(env_level)
        .or_else(|| config_level.and_then(parse_level))
        .unwrap_or(log::LevelFilter::Info)
}

/// Install the process logger. Later calls only adjust the level.
///
/// A log file that cannot be opened is reported on stderr and skipped.
pub fn init_log_bridge(level: log::LevelFilter, log_file: Option<&Path>) {
    let bridge = BRIDGE.get_or_init(|| {
        let file = log_file.and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => Some(f),
                Err(e) => {
                    eprintln!(
                        "shadergen: warning: cannot open log file {}: {e}",
                        path.display()
                    );
                    None
                }
            }
        });
        LogBridge {
            sink: Mutex::new(LogSink { file }),
        }
    });
    // Already installed when called a second time.
    let _ = log::set_logger(bridge);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_names() {
        assert_eq!(parse_level("debug"), Some(log::LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(log::LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(log::LevelFilter::Off));
        assert_eq!(parse_level("shadergen=debug"), None);
    }

    #[test]
    fn test_cli_level_wins() {
        assert_eq!(
            resolve_level(Some(log::LevelFilter::Trace), Some("error")),
            log::LevelFilter::Trace
        );
    }
}
