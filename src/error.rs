//! # Error Taxonomy
//!
//! Every failure in the analysis workflow is a [`CalorieError`]. The variants
//! follow how a failure should be presented rather than where it came from:
//!
//! - **Config**: fatal and pre-flight. A missing API key blocks every
//!   analysis attempt and is shown persistently.
//! - **Input**: recoverable and local. Wrong file type, nothing selected,
//!   camera denied/absent/unavailable.
//! - **Encoding**: the selected image could not be read.
//! - **Transport**: the model call failed, including the invalid-key case.
//! - **Format**: the model answered, but not with a valid list of food items.
//! - **Auth** / **Storage**: the access layer (accounts, view counter).
//!
//! Recoverable errors clear on the next user action. Nothing is retried
//! automatically.
//!
//! ## Usage
//!
//! ```rust
//! use calorie_lens::error::{CalorieError, HasSeverity, ErrorSeverity, classify};
//!
//! let error = CalorieError::missing_api_key();
//! assert!(classify::is_fatal(&error));
//! assert_eq!(error.severity(), ErrorSeverity::Fatal);
//!
//! let error = CalorieError::no_image();
//! assert!(classify::clears_on_next_action(&error));
//! ```

use std::{error::Error as StdError, fmt, path::PathBuf, time::SystemTime};

use food_parse::ParseError;

use crate::capture::CameraError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Degraded but non-blocking (e.g. the view counter is unreachable)
    Warning,
    /// The current action failed; the next action may succeed
    Error,
    /// Nothing can succeed until configuration changes
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Suggested recovery action shown next to the message
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// What went wrong with the user's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputErrorKind {
    /// Selected file is not JPEG, PNG, WEBP or GIF
    InvalidMediaType,
    /// Analysis requested with nothing selected or captured
    NoImage,
    /// The user or system refused access to the camera
    CameraPermissionDenied,
    /// No camera is present
    CameraNotFound,
    /// A camera exists but could not be used
    CameraUnavailable,
    /// "Take photo" without a live camera, or the frame could not be frozen
    CaptureFailed,
}

/// How the model call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The endpoint rejected the API key
    InvalidCredential,
    /// Network error, non-success status, or a refusal from the model
    Request,
    /// Failure with no usable cause
    Unknown,
}

/// Base error type for the calorie analysis workflow
#[derive(Debug)]
pub enum CalorieError {
    /// Configuration errors, including a missing API key
    Config {
        field: String,
        reason: String,
        context: ErrorContext,
    },
    /// Problems with the image the user supplied or tried to capture
    Input {
        kind: InputErrorKind,
        reason: String,
        context: ErrorContext,
    },
    /// Reading the image bytes failed
    Encoding {
        path: Option<PathBuf>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// The model call failed
    Transport {
        kind: TransportErrorKind,
        reason: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// The model response is not a valid list of food items
    Format {
        source: ParseError,
        context: ErrorContext,
    },
    /// Authentication errors
    Auth {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Local persistence errors (accounts, view counter)
    Storage {
        resource: String,
        reason: String,
        context: ErrorContext,
    },
}

impl CalorieError {
    /// Create a configuration error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    /// The API key is absent. Blocks all analysis.
    pub fn missing_api_key() -> Self {
        Self::config(
            "api_key",
            "API key not configured. Analysis cannot proceed.",
        )
        .with_recovery_suggestion(
            "Set CALORIE_ANALYZER__API_KEY, GEMINI_API_KEY or API_KEY and restart",
        )
    }

    /// Create an input error
    pub fn input(kind: InputErrorKind, reason: impl Into<String>) -> Self {
        Self::Input {
            kind,
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Error),
        }
    }

    pub fn invalid_media_type(declared: impl fmt::Display) -> Self {
        Self::input(
            InputErrorKind::InvalidMediaType,
            "Invalid file type. Please upload an image (JPEG, PNG, GIF, WEBP).",
        )
        .with_recovery_suggestion(format!("'{}' is not a supported image", declared))
    }

    pub fn no_image() -> Self {
        Self::input(
            InputErrorKind::NoImage,
            "Please select an image or take a photo first.",
        )
    }

    /// Create an encoding error
    pub fn encoding(path: Option<PathBuf>, source: std::io::Error) -> Self {
        Self::Encoding {
            path,
            source,
            context: ErrorContext::new().with_operation("encode_image"),
        }
    }

    /// Create a transport error
    pub fn transport(kind: TransportErrorKind, reason: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            reason: reason.into(),
            source: None,
            context: ErrorContext::new().with_operation("analyze"),
        }
    }

    /// Transport error wrapping an underlying cause
    pub fn transport_with_source(
        reason: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Request,
            reason: reason.into(),
            source: Some(Box::new(source)),
            context: ErrorContext::new().with_operation("analyze"),
        }
    }

    pub fn invalid_credential() -> Self {
        Self::transport(
            TransportErrorKind::InvalidCredential,
            "Invalid API Key. Please check your API_KEY environment variable.",
        )
    }

    /// Create a format error
    pub fn format(source: ParseError) -> Self {
        Self::Format {
            source,
            context: ErrorContext::new().with_operation("parse_response"),
        }
    }

    /// Create an authentication error
    pub fn auth(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Auth {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a storage error
    pub fn storage(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            resource: resource.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Set the operation that was being performed
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Set recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity level
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. }
            | Self::Input { context, .. }
            | Self::Encoding { context, .. }
            | Self::Transport { context, .. }
            | Self::Format { context, .. }
            | Self::Auth { context, .. }
            | Self::Storage { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. }
            | Self::Input { context, .. }
            | Self::Encoding { context, .. }
            | Self::Transport { context, .. }
            | Self::Format { context, .. }
            | Self::Auth { context, .. }
            | Self::Storage { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Input { .. } => "input",
            Self::Encoding { .. } => "encoding",
            Self::Transport { .. } => "transport",
            Self::Format { .. } => "format",
            Self::Auth { .. } => "auth",
            Self::Storage { .. } => "storage",
        }
    }

    /// Input error kind, if this is an input error
    pub fn input_kind(&self) -> Option<InputErrorKind> {
        match self {
            Self::Input { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Transport error kind, if this is a transport error
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for CalorieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalorieError::Config { field, reason, .. } => {
                write!(f, "Configuration error in '{}': {}", field, reason)
            }
            CalorieError::Input { reason, .. } => write!(f, "{}", reason),
            CalorieError::Encoding { path, source, .. } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "Could not read image '{}': {}",
                        path.display(),
                        source
                    )
                } else {
                    write!(f, "Could not read image: {}", source)
                }
            }
            CalorieError::Transport { kind, reason, .. } => match kind {
                TransportErrorKind::Request => {
                    write!(f, "Gemini API request failed: {}", reason)
                }
                TransportErrorKind::InvalidCredential | TransportErrorKind::Unknown => {
                    write!(f, "{}", reason)
                }
            },
            CalorieError::Format { source, .. } => write!(f, "{}", source),
            CalorieError::Auth {
                operation, reason, ..
            } => {
                write!(f, "Authentication error during {}: {}", operation, reason)
            }
            CalorieError::Storage {
                resource, reason, ..
            } => {
                write!(f, "Storage error for {}: {}", resource, reason)
            }
        }
    }
}

impl StdError for CalorieError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Encoding { source, .. } => Some(source),
            Self::Transport {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            Self::Format { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type CalorieResult<T> = Result<T, CalorieError>;

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for CalorieError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for CalorieError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Fatal errors block every analysis until configuration changes
    pub fn is_fatal(error: &CalorieError) -> bool {
        matches!(error, CalorieError::Config { .. }) || error.severity() == ErrorSeverity::Fatal
    }

    /// Recoverable errors are reported and the user may simply try again
    pub fn is_recoverable(error: &CalorieError) -> bool {
        !is_fatal(error)
    }

    /// Errors that the next user-initiated action wipes from the display
    pub fn clears_on_next_action(error: &CalorieError) -> bool {
        matches!(
            error,
            CalorieError::Input { .. }
                | CalorieError::Encoding { .. }
                | CalorieError::Transport { .. }
                | CalorieError::Format { .. }
        )
    }

    /// Errors that only warrant a non-blocking warning
    pub fn is_degraded(error: &CalorieError) -> bool {
        error.severity() == ErrorSeverity::Warning
    }
}

/// Error conversion implementations
impl From<ParseError> for CalorieError {
    fn from(error: ParseError) -> Self {
        Self::format(error)
    }
}

impl From<CameraError> for CalorieError {
    fn from(error: CameraError) -> Self {
        let kind = match &error {
            CameraError::PermissionDenied => InputErrorKind::CameraPermissionDenied,
            CameraError::NotFound => InputErrorKind::CameraNotFound,
            CameraError::Unavailable(_) => InputErrorKind::CameraUnavailable,
            CameraError::Capture(_) => InputErrorKind::CaptureFailed,
        };
        Self::input(kind, error.to_string()).with_operation("camera")
    }
}

impl From<reqwest::Error> for CalorieError {
    fn from(error: reqwest::Error) -> Self {
        let reason = error.to_string();
        Self::transport_with_source(reason, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_fatal() {
        let error = CalorieError::missing_api_key();
        assert_eq!(error.category(), "config");
        assert!(classify::is_fatal(&error));
        assert!(!classify::clears_on_next_action(&error));
        assert!(error.recovery_suggestion().is_some());
        assert!(error.to_string().contains("API key not configured"));
    }

    #[test]
    fn test_input_errors_are_recoverable() {
        let error = CalorieError::invalid_media_type("text/plain");
        assert_eq!(error.input_kind(), Some(InputErrorKind::InvalidMediaType));
        assert!(classify::is_recoverable(&error));
        assert!(classify::clears_on_next_action(&error));
        assert_eq!(
            error.to_string(),
            "Invalid file type. Please upload an image (JPEG, PNG, GIF, WEBP)."
        );
    }

    #[test]
    fn test_transport_messages() {
        assert_eq!(
            CalorieError::invalid_credential().to_string(),
            "Invalid API Key. Please check your API_KEY environment variable."
        );
        let error = CalorieError::transport(TransportErrorKind::Request, "503 Service Unavailable");
        assert_eq!(
            error.to_string(),
            "Gemini API request failed: 503 Service Unavailable"
        );
        assert_eq!(error.transport_kind(), Some(TransportErrorKind::Request));
    }

    #[test]
    fn test_format_error_keeps_source() {
        let error = CalorieError::from(ParseError::NotArray { found: "a string" });
        assert_eq!(error.category(), "format");
        assert!(error.source().is_some());
        assert!(error.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn test_camera_error_mapping() {
        let denied = CalorieError::from(CameraError::PermissionDenied);
        assert_eq!(
            denied.input_kind(),
            Some(InputErrorKind::CameraPermissionDenied)
        );
        let absent = CalorieError::from(CameraError::NotFound);
        assert_eq!(absent.input_kind(), Some(InputErrorKind::CameraNotFound));
        let busy = CalorieError::from(CameraError::Unavailable("device busy".into()));
        assert_eq!(busy.input_kind(), Some(InputErrorKind::CameraUnavailable));
        assert!(busy.to_string().contains("device busy"));
    }

    #[test]
    fn test_storage_errors_degrade() {
        let error = CalorieError::storage("view counter", "disk full");
        assert!(classify::is_degraded(&error));
        assert!(!classify::is_fatal(&error));
    }
}
