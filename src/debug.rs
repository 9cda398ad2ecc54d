use parking_lot::Mutex;
/// Debug logging for tabkeep
///
/// Controlled by the DEBUG_LEVEL environment variable (or the CLI `--log-level`):
/// - 0 or unset: No debugging
/// - 1: Errors only
/// - 2: Info level (tab lifecycle, persistence)
/// - 3: Debug level (engine events, script dispatch)
/// - 4: Trace level (every operation, detailed info)
///
/// All output goes to /tmp/tabkeep_debug.log on Unix/macOS,
/// or %TEMP%\tabkeep_debug.log on Windows. `log::*!` records are routed into
/// the same file by [`init_log_bridge`], and mirrored to stderr when
/// RUST_LOG is set.
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Debug level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    fn from_env() -> Self {
        match std::env::var("DEBUG_LEVEL") {
            Ok(val) => val
                .trim()
                .parse::<u8>()
                .map(Self::from_u8)
                .unwrap_or(DebugLevel::Off),
            Err(_) => DebugLevel::Off,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => DebugLevel::Off,
            1 => DebugLevel::Error,
            2 => DebugLevel::Info,
            3 => DebugLevel::Debug,
            _ => DebugLevel::Trace,
        }
    }

    fn from_log(level: log::Level) -> Self {
        match level {
            log::Level::Error | log::Level::Warn => DebugLevel::Error,
            log::Level::Info => DebugLevel::Info,
            log::Level::Debug => DebugLevel::Debug,
            log::Level::Trace => DebugLevel::Trace,
        }
    }

    fn to_filter(self) -> log::LevelFilter {
        match self {
            DebugLevel::Off => log::LevelFilter::Off,
            DebugLevel::Error => log::LevelFilter::Warn,
            DebugLevel::Info => log::LevelFilter::Info,
            DebugLevel::Debug => log::LevelFilter::Debug,
            DebugLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for DebugLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(DebugLevel::Off),
            "error" | "warn" | "1" => Ok(DebugLevel::Error),
            "info" | "2" => Ok(DebugLevel::Info),
            "debug" | "3" => Ok(DebugLevel::Debug),
            "trace" | "4" => Ok(DebugLevel::Trace),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Global debug logger
struct DebugLogger {
    level: DebugLevel,
    file: Option<std::fs::File>,
}

impl DebugLogger {
    fn new(level: DebugLevel) -> Self {
        if level == DebugLevel::Off {
            return DebugLogger { level, file: None };
        }

        #[cfg(unix)]
        let log_path = std::path::PathBuf::from("/tmp/tabkeep_debug.log");
        #[cfg(windows)]
        let log_path = std::env::temp_dir().join("tabkeep_debug.log");

        // Silently run without a file if it can't be opened
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&log_path)
            .ok();

        let mut logger = DebugLogger { level, file };
        logger.write_raw(&format!(
            "\n{}\ntabkeep debug session started at {} (level={:?})\n{}\n",
            "=".repeat(80),
            get_timestamp(),
            level,
            "=".repeat(80)
        ));
        logger
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
    }

    fn log(&mut self, level: DebugLevel, category: &str, msg: &str) {
        if level <= self.level {
            let timestamp = get_timestamp();
            let level_str = match level {
                DebugLevel::Error => "ERROR",
                DebugLevel::Info => "INFO ",
                DebugLevel::Debug => "DEBUG",
                DebugLevel::Trace => "TRACE",
                DebugLevel::Off => return,
            };
            self.write_raw(&format!(
                "[{}] [{}] [{}] {}\n",
                timestamp, level_str, category, msg
            ));
        }
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new(DebugLevel::from_env())))
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Check if debugging is enabled at given level
pub fn is_enabled(level: DebugLevel) -> bool {
    let logger = get_logger().lock();
    level <= logger.level
}

/// Log a message at specified level
pub fn log(level: DebugLevel, category: &str, msg: &str) {
    let mut logger = get_logger().lock();
    logger.log(level, category, msg);
}

/// Log formatted message
pub fn logf(level: DebugLevel, category: &str, args: fmt::Arguments) {
    if is_enabled(level) {
        log(level, category, &format!("{}", args));
    }
}

/// `log` facade backend writing into the debug log file
struct LogBridge {
    mirror_stderr: bool,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let category = record.target();
        let message = format!("{}", record.args());
        get_logger()
            .lock()
            .log(DebugLevel::from_log(record.level()), category, &message);
        if self.mirror_stderr {
            eprintln!("[{}] [{}] {}", record.level(), category, message);
        }
    }

    fn flush(&self) {}
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Route `log::*!` records into the debug log file.
///
/// `level` (from `--log-level`) wins over DEBUG_LEVEL. Calling this more
/// than once keeps the first installation.
pub fn init_log_bridge(level: Option<DebugLevel>) {
    let level = level.unwrap_or_else(DebugLevel::from_env);
    if LOGGER.set(Mutex::new(DebugLogger::new(level))).is_err() {
        get_logger().lock().level = level;
    }

    let bridge = BRIDGE.get_or_init(|| LogBridge {
        mirror_stderr: std::env::var_os("RUST_LOG").is_some(),
    });
    if log::set_logger(bridge).is_ok() {
        log::set_max_level(level.to_filter());
    }
}

// Convenience macros for logging
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Error, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Info, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Debug, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Trace, $category, format_args!($($arg)*))
    };
}
