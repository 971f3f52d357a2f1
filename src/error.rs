//! Error types for driver bridge operations.
//!
//! The sentinel-style API on [`crate::DriverEngine`] and [`crate::PhysMemBridge`]
//! never surfaces these; they are returned by the `try_*` family and by the
//! configuration and parsing helpers.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: service lookup or session open failures
//! - **Call Errors**: the driver rejected a method call
//! - **Request Errors**: malformed wire records or unsupported widths
//! - **Parse / Config Errors**: user input and YAML configuration problems
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use physbridge::BridgeError;
//!
//! let error = BridgeError::service_not_found("PhysMemRW");
//! assert!(error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Driver service '{service}' not found")]
    ServiceNotFound { service: String },

    #[error("Driver service '{service}' rejected open (code {code:#x})")]
    OpenRejected { service: String, code: i32 },

    #[error("Driver call to selector {selector} failed (code {code:#x})")]
    CallFailed { selector: u32, code: i32 },

    #[error("Not connected to the driver")]
    NotConnected,

    #[error("Unsupported transfer width: {width} bytes")]
    InvalidWidth { width: u32 },

    #[error("Invalid memory access request: {details}")]
    InvalidRequest { details: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration in {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Configuration value out of range: {details}")]
    ConfigValue { details: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Monitor task error: {context}")]
    Monitor { context: String },
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::ServiceNotFound { .. } => true,
            BridgeError::OpenRejected { .. } => false,
            BridgeError::CallFailed { .. } => true,
            BridgeError::NotConnected => true,
            BridgeError::InvalidWidth { .. } => false,
            BridgeError::InvalidRequest { .. } => false,
            BridgeError::Parse { .. } => false,
            BridgeError::Config { .. } => false,
            BridgeError::ConfigValue { .. } => false,
            BridgeError::File { .. } => false,
            BridgeError::UnsupportedPlatform { .. } => false,
            BridgeError::Monitor { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::ServiceNotFound { .. } => vec![
                "Check that the PhysMemRW kernel extension is loaded",
                "Verify the service name in the configuration",
            ],
            BridgeError::OpenRejected { .. } => vec![
                "Run the tool with sufficient privileges",
                "Check that the client is allowed to open the driver",
            ],
            BridgeError::CallFailed { .. } => vec![
                "Verify the physical address is mapped and accessible",
                "Check the system log for driver messages",
            ],
            BridgeError::NotConnected => vec!["Connect to the driver before issuing requests"],
            BridgeError::InvalidWidth { .. } => vec!["Use a transfer width of 1, 2, 4 or 8 bytes"],
            BridgeError::InvalidRequest { .. } => vec![
                "Check that the buffer holds exactly one request record",
                "Verify both sides agree on the request layout",
            ],
            BridgeError::Parse { .. } => vec![
                "Enter values as hexadecimal, with or without a 0x prefix",
                "Check for stray characters in the input",
            ],
            BridgeError::Config { .. } | BridgeError::ConfigValue { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Compare field names and ranges with the documented defaults",
            ],
            BridgeError::File { .. } => {
                vec!["Check the file exists and is readable", "Check file permissions"]
            }
            BridgeError::UnsupportedPlatform { .. } => vec![
                "Run on macOS where the driver is available",
                "Use the mock driver for testing on other platforms",
            ],
            BridgeError::Monitor { .. } => vec!["Restart the monitor"],
        }
    }

    /// Helper constructor for missing driver services.
    pub fn service_not_found(service: impl Into<String>) -> Self {
        BridgeError::ServiceNotFound { service: service.into() }
    }

    /// Helper constructor for rejected session opens.
    pub fn open_rejected(service: impl Into<String>, code: i32) -> Self {
        BridgeError::OpenRejected { service: service.into(), code }
    }

    /// Helper constructor for failed driver calls.
    pub fn call_failed(selector: u32, code: i32) -> Self {
        BridgeError::CallFailed { selector, code }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        BridgeError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        BridgeError::File { path, source }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        BridgeError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            service in "\\w+",
            code in any::<i32>(),
            selector in 0u32..16u32,
            details in ".*"
          ) {
            let not_found = BridgeError::service_not_found(service.clone());
            prop_assert!(not_found.to_string().contains(&service));

            let rejected = BridgeError::open_rejected(service.clone(), code);
            let code_hex = format!("{:#x}", code);
            prop_assert!(rejected.to_string().contains(&code_hex));

            let call = BridgeError::call_failed(selector, code);
            prop_assert!(call.to_string().contains(&selector.to_string()));

            let parse = BridgeError::parse_error("address", details.clone());
            prop_assert!(parse.to_string().contains(&details));
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<BridgeError>();

        let error = BridgeError::NotConnected;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let missing = BridgeError::service_not_found("PhysMemRW");
        let rejected = BridgeError::open_rejected("PhysMemRW", 0x2c1);
        let width = BridgeError::InvalidWidth { width: 3 };

        assert!(missing.is_retryable());
        assert!(!rejected.is_retryable());
        assert!(!width.is_retryable());

        for error in [&missing, &rejected, &width] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn io_errors_convert_to_file_errors() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing config");
        let err: BridgeError = io_err.into();

        match err {
            BridgeError::File { source, .. } => assert_eq!(source.to_string(), "missing config"),
            other => panic!("Expected File error variant, got {other:?}"),
        }
    }
}
