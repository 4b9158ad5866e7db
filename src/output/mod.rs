// Output formatting utilities for terminal and JSON modes

use is_terminal::IsTerminal;

// Colors for terminal output (when supported)
pub const RED: &str = "\x1b[0;31m";
pub const GREEN: &str = "\x1b[0;32m";
pub const YELLOW: &str = "\x1b[1;33m";
pub const MAGENTA: &str = "\x1b[0;35m";
pub const BOLD: &str = "\x1b[1m";
pub const NC: &str = "\x1b[0m"; // No Color

/// Check if stdout is a terminal (for color output)
#[inline]
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Print info message
pub fn info(msg: &str) {
    let color = if is_terminal() { GREEN } else { "" };
    let reset = if is_terminal() { NC } else { "" };
    println!("{}[INFO]{} {}", color, reset, msg);
}

/// Print warning message
pub fn warn(msg: &str) {
    let color = if is_terminal() { YELLOW } else { "" };
    let reset = if is_terminal() { NC } else { "" };
    eprintln!("{}[WARN]{} {}", color, reset, msg);
}

/// Print error message
pub fn error(msg: &str) {
    let color = if is_terminal() { RED } else { "" };
    let reset = if is_terminal() { NC } else { "" };
    eprintln!("{}[ERROR]{} {}", color, reset, msg);
}

/// Print success message
pub fn success(msg: &str) {
    let color = if is_terminal() { MAGENTA } else { "" };
    let reset = if is_terminal() { NC } else { "" };
    println!("{}[OK]{} {}", color, reset, msg);
}

/// Print section header
pub fn header(msg: &str) {
    let bold = if is_terminal() { BOLD } else { "" };
    let reset = if is_terminal() { NC } else { "" };
    println!("{}===>{} {}", bold, reset, msg);
    println!();
}

/// Exit codes (clap reserves 2 for usage errors)
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_DATABASE: i32 = 3;
pub const EXIT_FILE_NOT_FOUND: i32 = 4;
pub const EXIT_VALIDATION: i32 = 5;

// ============================================================================
// Error Codes and Remediation
// ============================================================================

/// Error codes for JSON error responses
pub const E_CONFIG_NOT_FOUND: &str = "E001";
pub const E_CONFIG_INVALID: &str = "E002";
pub const E_STORE_ERROR: &str = "E003";
pub const E_REPORT_NOT_FOUND: &str = "E004";
pub const E_INVALID_INPUT: &str = "E005";

/// Common remediation messages
pub const R_HINT_SAMPLE_CONFIG: &str =
    "Edit the generated sample configuration and re-run 'migrascope analyze'";
pub const R_HINT_INIT_STORE: &str = "Run 'migrascope init-store' to create the results store";

/// JSON output wrapper
#[derive(Debug, Clone, serde::Serialize)]
pub struct JsonResponse<T> {
    pub schema_version: String,
    pub execution_id: String,
    pub tool: String,
    pub timestamp: String,
    pub data: T,
}

impl<T: serde::Serialize> JsonResponse<T> {
    pub fn new(data: T) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let timestamp = chrono::Utc::now().to_rfc3339();
        let exec_id = format!(
            "{:x}-{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            std::process::id()
        );

        JsonResponse {
            schema_version: "1.0.0".to_string(),
            execution_id: exec_id,
            tool: "migrascope".to_string(),
            timestamp,
            data,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Error response format for JSON mode
#[derive(Debug, Clone, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl JsonError {
    pub fn new(category: &str, message: &str, code: &str) -> Self {
        JsonError {
            error: category.to_string(),
            message: message.to_string(),
            code: code.to_string(),
            remediation: None,
        }
    }

    pub fn with_remediation(mut self, remediation: &str) -> Self {
        self.remediation = Some(remediation.to_string());
        self
    }

    /// Configuration file not found, sample written
    pub fn config_not_found(path: &str) -> Self {
        Self::new(
            "ConfigNotFound",
            &format!("Configuration not found: {}", path),
            E_CONFIG_NOT_FOUND,
        )
        .with_remediation(R_HINT_SAMPLE_CONFIG)
    }

    /// Configuration present but rejected by validation
    pub fn config_invalid(msg: &str) -> Self {
        Self::new(
            "ConfigInvalid",
            &format!("Invalid configuration: {}", msg),
            E_CONFIG_INVALID,
        )
    }

    /// Input that could not be parsed
    pub fn invalid_input(msg: &str) -> Self {
        Self::new("InvalidInput", msg, E_INVALID_INPUT)
    }

    /// Results store could not be opened
    pub fn store_error(msg: &str) -> Self {
        Self::new(
            "StoreError",
            &format!("Results store error: {}", msg),
            E_STORE_ERROR,
        )
        .with_remediation(R_HINT_INIT_STORE)
    }

    /// Report file not found
    pub fn report_not_found(path: &str) -> Self {
        Self::new(
            "ReportNotFound",
            &format!("Report not found: {}", path),
            E_REPORT_NOT_FOUND,
        )
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
