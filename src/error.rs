//! Unified error handling for the gleaner crate
//!
//! Domain errors live in [`crate::utils::error`]. They share the
//! [`GleanerErrorTrait`] interface: the fetchers retry exactly the errors that
//! report themselves recoverable, and crawl logs tag every failure with its
//! [`ErrorCategory`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use gleaner::error::{Error, GleanerErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {err}");
//!     } else {
//!         eprintln!("Fatal {}: {err}", err.category().description());
//!     }
//! }
//! ```

use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{DateError, ExtractError, FetchError, SinkError, SpecError};

/// Common trait for all gleaner error types
pub trait GleanerErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Extraction misses: empty required fields, regex without match
    Extraction,
    /// Broken scraper definitions and configuration files
    Config,
    /// Output writer errors
    Output,
}

impl ErrorCategory {
    /// Short human readable description of the category
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Extraction => "extraction error",
            Self::Config => "configuration error",
            Self::Output => "output error",
        }
    }
}

impl GleanerErrorTrait for FetchError {
    /// Connection failures, timeouts and the statuses 429, 500, 502, 503, 504
    ///
    /// Other client and server errors are final, and so is a request whose
    /// retries are already spent.
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::ServerError(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::MaxRetriesExceeded { .. } | Self::InvalidUrl(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl GleanerErrorTrait for DateError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownTimeZone(_)
            | Self::UnsupportedLanguage(_)
            | Self::PartCoveredTwice(_)
            | Self::MissingDayOrMonth
            | Self::NoLayouts => ErrorCategory::Config,
            Self::Layout { .. } | Self::NonexistentLocalTime(_) => ErrorCategory::Extraction,
        }
    }
}

impl GleanerErrorTrait for ExtractError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Subpage { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSelector { .. } | Self::InvalidRegex { .. } => ErrorCategory::Config,
            Self::Subpage { .. } => ErrorCategory::Network,
            Self::Date(e) => e.category(),
            Self::NoRegexMatch { .. }
            | Self::RegexIndexOutOfBounds { .. }
            | Self::EmptyField { .. }
            | Self::MissingSubpageUrl { .. } => ErrorCategory::Extraction,
        }
    }
}

impl GleanerErrorTrait for SpecError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Config
    }
}

/// Error that ends a scraper run early
#[derive(Error, Debug)]
pub enum Error {
    /// A listing page could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The consumer of the item stream went away
    #[error("Output channel closed")]
    SinkClosed,
}

impl GleanerErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::SinkClosed => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            Self::SinkClosed => ErrorCategory::Output,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
