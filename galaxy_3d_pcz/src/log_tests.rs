//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, and DefaultLogger filtering.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, message: &str) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "galaxy3d::Zone".to_string(),
        message: message.to_string(),
        file: None,
        line: None,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Warn), "Warn");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

#[test]
fn test_log_severity_max_picks_most_severe() {
    let worst = [LogSeverity::Debug, LogSeverity::Error, LogSeverity::Info]
        .into_iter()
        .max();
    assert_eq!(worst, Some(LogSeverity::Error));
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_without_file_line() {
    let e = entry(LogSeverity::Info, "Connecting portal door to portal door_back");
    assert_eq!(e.severity, LogSeverity::Info);
    assert_eq!(e.source, "galaxy3d::Zone");
    assert!(e.file.is_none());
    assert!(e.line.is_none());
}

#[test]
fn test_log_entry_with_file_line() {
    let e = LogEntry {
        file: Some("portal_graph.rs"),
        line: Some(42),
        ..entry(LogSeverity::Error, "portal has no target zone")
    };
    assert_eq!(e.file, Some("portal_graph.rs"));
    assert_eq!(e.line, Some(42));
}

#[test]
fn test_log_entry_clone_and_debug() {
    let e1 = entry(LogSeverity::Warn, "object outside every zone");
    let e2 = e1.clone();
    assert_eq!(e1.severity, e2.severity);
    assert_eq!(e1.message, e2.message);

    let debug_str = format!("{:?}", e2);
    assert!(debug_str.contains("Warn"));
    assert!(debug_str.contains("object outside every zone"));
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_threshold_is_info() {
    assert_eq!(DefaultLogger::default().min_severity(), LogSeverity::Info);
}

#[test]
fn test_default_logger_custom_threshold() {
    let logger = DefaultLogger::new(LogSeverity::Trace);
    assert_eq!(logger.min_severity(), LogSeverity::Trace);
}

#[test]
fn test_default_logger_all_severities() {
    // Filtered and printed branches must both be panic-free
    let logger = DefaultLogger::default();
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&entry(severity, "message"));
        logger.log(&LogEntry {
            file: Some("zone.rs"),
            line: Some(7),
            ..entry(severity, "message with location")
        });
    }
}

// ============================================================================
// LOGGER TRAIT TESTS
// ============================================================================

struct CountingLogger {
    logged_count: std::sync::Mutex<usize>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.logged_count.lock().unwrap() += 1;
    }
}

#[test]
fn test_custom_logger_implementation() {
    let logger = CountingLogger { logged_count: std::sync::Mutex::new(0) };
    logger.log(&entry(LogSeverity::Trace, "a"));
    logger.log(&entry(LogSeverity::Trace, "b"));
    assert_eq!(*logger.logged_count.lock().unwrap(), 2);
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}
