//! Error types for attendance registration
//!
//! Component errors ([`LocationError`], [`CalendarError`], [`CredentialsError`])
//! carry diagnostic detail for logs. The registration flow collapses them into
//! [`RegistrationError`], the taxonomy the page turns into messages.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for registration operations
pub type Result<T> = std::result::Result<T, RegistrationError>;

/// Every way a registration run can stop short of (or fail at) commit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// Caller IP or its geolocation could not be resolved
    #[error("caller location could not be determined")]
    LocationUnavailable,

    /// Caller resolved outside the allowed radius
    #[error("caller is {distance_km:.2} km from the reference point")]
    TooFar {
        /// Great-circle distance to the reference point
        distance_km: f64,
    },

    /// Calendar missing, unreadable, or without events
    #[error("no events configured")]
    NoEventsConfigured,

    /// Calendar has events, none of them today
    #[error("no event scheduled for today")]
    NoEventToday,

    /// Service-account payload missing, malformed, or rejected
    #[error("ledger credentials unavailable")]
    CredentialsUnavailable,

    /// Ledger read or append failed
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// A row for this identity and date already exists
    #[error("already registered today")]
    AlreadyRegistered,

    /// Submitted display name was blank
    #[error("display name is empty")]
    EmptyName,

    /// Name submitted to a session that already committed or failed
    #[error("registration session is closed")]
    SessionClosed,
}

impl RegistrationError {
    /// Wrap any displayable ledger failure
    #[inline]
    #[must_use = "returns RegistrationError for ledger failures"]
    pub fn ledger(err: impl std::fmt::Display) -> Self {
        Self::LedgerUnavailable(err.to_string())
    }
}

/// Failures while resolving the caller's IP address or coordinate
#[derive(Error, Debug)]
pub enum LocationError {
    /// Neither the socket probe nor hostname resolution produced an address
    #[error("could not determine outbound IP address: {0}")]
    IpUnavailable(String),

    /// Geolocation request failed at the transport level
    #[error("geolocation request failed: {0}")]
    Request(String),

    /// Geolocation response body was not the expected JSON
    #[error("invalid geolocation response: {0}")]
    InvalidResponse(String),

    /// Geolocation service answered with a non-success status
    #[error("geolocation lookup failed for {ip}: {message}")]
    LookupFailed {
        /// Address that was looked up
        ip: String,
        /// Status or message reported by the service
        message: String,
    },
}

/// Error type for calendar parsing operations
#[derive(Error, Debug)]
pub enum CalendarError {
    /// Failed to read calendar file from disk
    #[error("Failed to read calendar file {path}: {source}")]
    ReadError {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Calendar file has invalid format or structure
    #[error("Invalid calendar format in {path}: {message}")]
    InvalidFormat {
        /// Path to the file with invalid format
        path: PathBuf,
        /// Description of the format error
        message: String,
    },

    /// An event component lacks a usable start date
    #[error("Invalid event in {path}: {message}")]
    InvalidEvent {
        /// Path to the calendar file
        path: PathBuf,
        /// Description of the event problem
        message: String,
    },
}

impl CalendarError {
    /// Create a read error
    #[inline]
    #[must_use = "returns CalendarError for file read failures"]
    pub fn read_error<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an invalid format error
    #[inline]
    #[must_use = "returns CalendarError for invalid format"]
    pub fn invalid_format<P: AsRef<Path>>(path: P, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create an invalid event error
    #[inline]
    #[must_use = "returns CalendarError for malformed events"]
    pub fn invalid_event<P: AsRef<Path>>(path: P, message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }
}

/// Failures while loading or exchanging service-account credentials
#[derive(Error, Debug)]
pub enum CredentialsError {
    /// No credentials payload was configured
    #[error("no service-account credentials configured")]
    Missing,

    /// Payload is not a service-account JSON document
    #[error("invalid service-account payload: {0}")]
    InvalidKey(#[from] serde_json::Error),

    /// JWT assertion could not be signed with the private key
    #[error("failed to sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Token endpoint rejected the assertion or was unreachable
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_far_display_uses_two_decimals() {
        let err = RegistrationError::TooFar { distance_km: 5.0 };
        assert_eq!(err.to_string(), "caller is 5.00 km from the reference point");
    }

    #[test]
    fn test_ledger_helper_keeps_detail() {
        let err = RegistrationError::ledger("HTTP 403");
        assert_eq!(err, RegistrationError::LedgerUnavailable("HTTP 403".to_string()));
    }

    #[test]
    fn test_calendar_error_mentions_path() {
        let err = CalendarError::invalid_event("calendar.ics", "event has no DTSTART");
        let text = err.to_string();
        assert!(text.contains("calendar.ics"));
        assert!(text.contains("DTSTART"));
    }
}
