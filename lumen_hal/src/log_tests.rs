//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, and the global dispatch.

use crate::log::{dispatch, dispatch_detailed, reset_logger, set_logger, LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

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
fn test_log_severity_equality() {
    assert_eq!(LogSeverity::Info, LogSeverity::Info);
    assert_ne!(LogSeverity::Trace, LogSeverity::Error);
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_without_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "lumen::pipeline".to_string(),
        message: "Backend attached".to_string(),
        file: None,
        line: None,
    };

    assert_eq!(entry.severity, LogSeverity::Info);
    assert_eq!(entry.source, "lumen::pipeline");
    assert!(entry.file.is_none());
    assert!(entry.line.is_none());
}

#[test]
fn test_log_entry_with_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "lumen::vulkan".to_string(),
        message: "Allocation failed".to_string(),
        file: Some("vulkan_device.rs"),
        line: Some(42),
    };

    assert_eq!(entry.file, Some("vulkan_device.rs"));
    assert_eq!(entry.line, Some(42));
}

// ============================================================================
// GLOBAL DISPATCH TESTS
// ============================================================================

/// Logger that captures entries for assertions
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
#[serial]
fn test_dispatch_reaches_installed_logger() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    set_logger(CaptureLogger { entries: Arc::clone(&entries) });

    dispatch(LogSeverity::Warn, "lumen::test", "a warning".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].severity, LogSeverity::Warn);
        assert_eq!(captured[0].source, "lumen::test");
        assert_eq!(captured[0].message, "a warning");
    }

    reset_logger();
}

#[test]
#[serial]
fn test_dispatch_detailed_carries_location() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    set_logger(CaptureLogger { entries: Arc::clone(&entries) });

    dispatch_detailed(
        LogSeverity::Error,
        "lumen::test",
        "an error".to_string(),
        "some_file.rs",
        7,
    );

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].file, Some("some_file.rs"));
        assert_eq!(captured[0].line, Some(7));
    }

    reset_logger();
}

#[test]
#[serial]
fn test_hal_err_macro_logs_and_builds_error() {
    use crate::error::Error;

    let entries = Arc::new(Mutex::new(Vec::new()));
    set_logger(CaptureLogger { entries: Arc::clone(&entries) });

    let err = crate::hal_err!("lumen::test", "fence {} lost", 3);
    assert_eq!(err, Error::BackendFailure("fence 3 lost".to_string()));

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].message, "fence 3 lost");
        assert_eq!(captured[0].severity, LogSeverity::Error);
        assert!(captured[0].file.is_some());
    }

    reset_logger();
}
