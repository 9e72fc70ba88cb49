//! Backend configuration

/// Severity filter for backend validation messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything, including informational and verbose messages
    All,
}

/// Output sink for backend validation messages
#[derive(Debug, Clone)]
pub enum DebugOutput {
    /// Colored console output (stderr)
    Console,
    /// Append to a log file
    File(String),
    /// Console and file
    Both(String),
}

/// Backend configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name reported to the driver
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Severity filter for validation messages
    pub debug_severity: DebugSeverity,
    /// Output sink for validation messages
    pub debug_output: DebugOutput,
    /// Abort the process when a validation error is reported
    pub break_on_validation_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Lumen Application".to_string(),
            app_version: (1, 0, 0),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            break_on_validation_error: false,
        }
    }
}
