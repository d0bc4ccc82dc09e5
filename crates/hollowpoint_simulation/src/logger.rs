//! Pluggable logger для симуляции
//!
//! Ядро headless и не знает куда писать (консоль, движок, файл) —
//! printer внедряется снаружи через `set_logger`. По умолчанию консоль.

use once_cell::sync::Lazy;
use std::sync::Mutex;

static LOGGER: Lazy<Mutex<Option<Box<dyn LogPrinter>>>> = Lazy::new(|| Mutex::new(None));
static LOG_LEVEL: Lazy<Mutex<LogLevel>> = Lazy::new(|| Mutex::new(LogLevel::Debug));

/// Уровни логирования (фильтрация через `set_log_level`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Backend логгера (консоль по умолчанию, движок может подменить)
pub trait LogPrinter: Send + Sync {
    fn print(&self, level: LogLevel, message: &str);
}

pub fn set_logger(logger: Box<dyn LogPrinter>) {
    *LOGGER.lock().unwrap() = Some(logger);
}

pub fn set_logger_if_needed(logger: Box<dyn LogPrinter>) {
    let mut slot = LOGGER.lock().unwrap();
    if slot.is_none() {
        *slot = Some(logger);
    }
}

pub fn set_log_level(level: LogLevel) {
    *LOG_LEVEL.lock().unwrap() = level;
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

pub fn log_with_level(level: LogLevel, message: &str) {
    if level < *LOG_LEVEL.lock().unwrap() {
        return;
    }
    // Timestamp добавляем здесь, а не в printer'е
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        logger.print(level, &format!("[{}] {}", timestamp, message));
    }
}

struct ConsoleLogger;

impl LogPrinter for ConsoleLogger {
    fn print(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_str(), message);
    }
}

pub fn init_logger() {
    set_logger_if_needed(Box::new(ConsoleLogger));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }
}
