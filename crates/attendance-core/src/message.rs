//! User-facing text for every registration outcome.
//!
//! The flow only returns typed results; this is the one place that turns
//! them into words.

use crate::error::RegistrationError;
use crate::ledger::AttendanceRecord;

pub const PAGE_TITLE: &str = "Attendance Registration";
pub const PAGE_SUBTITLE: &str = "Port Management Specialization";

/// How a notice is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Success,
}

/// A status line shown on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

impl Notice {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }

    pub fn for_error(err: &RegistrationError) -> Self {
        Self::new(err.severity(), error_text(err))
    }

    pub fn registered(record: &AttendanceRecord) -> Self {
        Self::new(
            Severity::Success,
            format!(
                "Attendance for {} registered successfully for the event: {}!",
                record.display_name, record.event_name
            ),
        )
    }
}

impl RegistrationError {
    /// Conditions the user can simply wait out or correct are warnings
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::NoEventToday | Self::AlreadyRegistered | Self::EmptyName => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Heading shown once today's event is known
#[must_use]
pub fn event_heading(event_name: &str) -> String {
    format!("Today's course: {event_name}")
}

fn error_text(err: &RegistrationError) -> String {
    match err {
        RegistrationError::LocationUnavailable => {
            "Access denied: your location could not be determined. \
             You must be near the campus to register attendance."
                .to_string()
        }
        RegistrationError::TooFar { distance_km } => format!(
            "Access denied: you are too far from the campus. Current distance: {distance_km:.2} km"
        ),
        RegistrationError::NoEventsConfigured => {
            "Could not load the event dates. Registration is closed.".to_string()
        }
        RegistrationError::NoEventToday => "There is no event scheduled for today.".to_string(),
        RegistrationError::CredentialsUnavailable => {
            "Could not load the spreadsheet credentials.".to_string()
        }
        RegistrationError::LedgerUnavailable(detail) => {
            format!("Could not reach the attendance spreadsheet: {detail}")
        }
        RegistrationError::AlreadyRegistered => {
            "You have already registered your attendance today.".to_string()
        }
        RegistrationError::EmptyName => "Please enter your name before registering.".to_string(),
        RegistrationError::SessionClosed => {
            "This registration session has already finished.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityHash;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn all_errors() -> Vec<RegistrationError> {
        vec![
            RegistrationError::LocationUnavailable,
            RegistrationError::TooFar { distance_km: 5.0 },
            RegistrationError::NoEventsConfigured,
            RegistrationError::NoEventToday,
            RegistrationError::CredentialsUnavailable,
            RegistrationError::LedgerUnavailable("timeout".to_string()),
            RegistrationError::AlreadyRegistered,
            RegistrationError::EmptyName,
            RegistrationError::SessionClosed,
        ]
    }

    #[test]
    fn test_every_condition_has_distinct_text() {
        let texts: HashSet<String> = all_errors()
            .iter()
            .map(|err| Notice::for_error(err).text)
            .collect();
        assert_eq!(texts.len(), all_errors().len());
    }

    #[test]
    fn test_too_far_reports_two_decimals() {
        let notice = Notice::for_error(&RegistrationError::TooFar {
            distance_km: 5.004_9,
        });
        assert_eq!(notice.severity, Severity::Error);
        assert!(notice.text.contains("5.00 km"), "{}", notice.text);
    }

    #[test]
    fn test_warning_severities() {
        assert_eq!(RegistrationError::NoEventToday.severity(), Severity::Warning);
        assert_eq!(RegistrationError::AlreadyRegistered.severity(), Severity::Warning);
        assert_eq!(RegistrationError::EmptyName.severity(), Severity::Warning);
        assert_eq!(RegistrationError::LocationUnavailable.severity(), Severity::Error);
        assert_eq!(
            RegistrationError::CredentialsUnavailable.severity(),
            Severity::Error
        );
    }

    #[test]
    fn test_registered_names_person_and_event() {
        let record = AttendanceRecord::new(
            &IdentityHash::from_address("10.0.0.1"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Ana",
            "Seminar",
        );
        let notice = Notice::registered(&record);
        assert_eq!(notice.severity, Severity::Success);
        assert!(notice.text.contains("Ana"));
        assert!(notice.text.contains("Seminar"));
    }

    #[test]
    fn test_event_heading() {
        assert_eq!(event_heading("Maritime Law"), "Today's course: Maritime Law");
    }
}
