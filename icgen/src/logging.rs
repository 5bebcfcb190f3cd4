//! Forwarding of log messages to a user-provided callback.
//!
//! This crate emits messages through the `log` facade, and never installs a
//! logger on its own. Applications can either use any `log` implementation,
//! or call [`set_logging_callback`] to receive messages in a simple function.

use std::sync::Mutex;

use log::{Level, Metadata, Record};
use once_cell::sync::Lazy;

/// Callback receiving the level and the formatted content of log messages
pub type LoggingCallback = Box<dyn Fn(Level, &str) + Send + 'static>;

static GLOBAL_CALLBACK: Lazy<Mutex<Option<LoggingCallback>>> = Lazy::new(|| Mutex::new(None));

/// Implementation of `log::Log` that forward all log messages to the global
/// callback.
struct CallbackLogger;

/// Send all log messages to `callback`, replacing any callback set by a
/// previous call to this function.
///
/// Messages are formatted as `<target> -- <message>`. Debug messages are only
/// emitted in debug builds.
///
/// ```
/// icgen::logging::set_logging_callback(|level, message| {
///     eprintln!("[{}] {}", level, message);
/// });
/// ```
pub fn set_logging_callback(callback: impl Fn(Level, &str) + Send + 'static) {
    *GLOBAL_CALLBACK.lock().expect("mutex was poisoned") = Some(Box::new(callback));
    // we allow multiple sets of logger, therefore the result will be ignored
    let _ = log::set_boxed_logger(Box::new(CallbackLogger));

    if cfg!(debug_assertions) {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }
}

impl log::Log for CallbackLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        return true;
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("{} -- {}", record.target(), record.args());
            let callback = GLOBAL_CALLBACK.lock().expect("mutex was poisoned");
            if let Some(callback) = &*callback {
                callback(record.level(), &message);
            }
        }
    }

    fn flush(&self) {}
}
