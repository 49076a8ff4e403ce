//! Registration flow
//!
//! A strictly forward state machine. [`RegistrationFlow::begin`] runs the
//! gates that need no user input:
//!
//! ```text
//! LocationCheck → EventCheck → LedgerInit → DuplicateCheck → Session
//! ```
//!
//! The returned [`Session`] holds everything those gates established and sits
//! in name collection until a non-blank name is submitted. Blank names keep it
//! there, so earlier gates never re-run. Any other error ends the run, and
//! the user must start over.

use crate::calendar::{event_for_date, load_events, CalendarEvent, CALENDAR_FILE};
use crate::error::{RegistrationError, Result};
use crate::geo::{distance_km, within_range, REFERENCE_POINT};
use crate::identity::IdentityHash;
use crate::ledger::{date_key, AttendanceRecord, Ledger, LedgerFactory};
use crate::locator::Locator;
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Runs the registration gates against injected collaborators
pub struct RegistrationFlow<L, F> {
    locator: L,
    ledger_factory: F,
    calendar_path: PathBuf,
    today: NaiveDate,
}

impl<L, F> RegistrationFlow<L, F>
where
    L: Locator,
    F: LedgerFactory,
{
    /// Flow over the fixed calendar file, dated by the local clock
    pub fn new(locator: L, ledger_factory: F) -> Self {
        Self {
            locator,
            ledger_factory,
            calendar_path: PathBuf::from(CALENDAR_FILE),
            today: Local::now().date_naive(),
        }
    }

    /// Read events from another calendar file
    #[must_use]
    pub fn with_calendar_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.calendar_path = path.into();
        self
    }

    /// Treat `today` as the current date
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Run every gate up to name collection.
    ///
    /// # Errors
    ///
    /// The first gate that fails decides the error; later gates are not run.
    pub fn begin(&self) -> Result<Session<F::Ledger>> {
        let distance = self.check_location()?;
        debug!(distance_km = distance, "Location check passed");

        let event = self.check_event()?;
        info!(event = %event.name, date = %event.date, "Event scheduled today");

        let ledger = self.ledger_factory.open()?;
        let existing_rows = ledger.read_all()?.len();
        debug!(existing_rows, "Ledger opened");

        let identity = self.check_not_registered(&ledger, existing_rows)?;

        Ok(Session {
            ledger,
            identity,
            event,
            date: self.today,
            state: SessionState::AwaitingName,
        })
    }

    fn check_location(&self) -> Result<f64> {
        let (ip, coordinate) = self.locator.resolve_caller_location().map_err(|err| {
            warn!("Caller location unavailable: {err}");
            RegistrationError::LocationUnavailable
        })?;

        let distance = distance_km(coordinate, REFERENCE_POINT);
        if !within_range(distance) {
            info!(%ip, distance_km = distance, "Caller outside allowed radius");
            return Err(RegistrationError::TooFar {
                distance_km: distance,
            });
        }
        Ok(distance)
    }

    fn check_event(&self) -> Result<CalendarEvent> {
        let events = load_events(&self.calendar_path);
        if events.is_empty() {
            return Err(RegistrationError::NoEventsConfigured);
        }

        event_for_date(&events, self.today)
            .cloned()
            .ok_or(RegistrationError::NoEventToday)
    }

    fn check_not_registered(
        &self,
        ledger: &F::Ledger,
        existing_rows: usize,
    ) -> Result<IdentityHash> {
        // Resolved again rather than reused from the location gate
        let ip = self.locator.caller_ip().map_err(|err| {
            warn!("Caller IP unavailable for identity hash: {err}");
            RegistrationError::LocationUnavailable
        })?;
        let identity = IdentityHash::from_address(&ip.to_string());

        // An empty ledger skips the scan entirely
        if existing_rows > 0
            && ledger.has_registered_today(identity.as_str(), &date_key(self.today))?
        {
            info!(date = %self.today, "Caller already registered today");
            return Err(RegistrationError::AlreadyRegistered);
        }

        Ok(identity)
    }
}

/// Where a [`Session`] stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Gates passed, waiting for a display name
    AwaitingName,
    /// Row appended
    Committed,
    /// Append failed
    Failed,
}

/// A run that has passed every gate and is collecting a name
#[derive(Debug)]
pub struct Session<G> {
    ledger: G,
    identity: IdentityHash,
    event: CalendarEvent,
    date: NaiveDate,
    state: SessionState,
}

impl<G: Ledger> Session<G> {
    pub fn event(&self) -> &CalendarEvent {
        &self.event
    }

    pub fn event_name(&self) -> &str {
        &self.event.name
    }

    pub fn identity(&self) -> &IdentityHash {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Submit a display name and commit the registration.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EmptyName`] for a blank name; the session keeps
    ///   waiting for another one
    /// - [`RegistrationError::LedgerUnavailable`] if the append fails; the
    ///   session is finished
    /// - [`RegistrationError::SessionClosed`] once the session is finished
    pub fn submit_name(&mut self, name: &str) -> Result<AttendanceRecord> {
        if self.state != SessionState::AwaitingName {
            return Err(RegistrationError::SessionClosed);
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }

        let record = AttendanceRecord::new(&self.identity, self.date, name, &self.event.name);
        match self.ledger.append(&record) {
            Ok(()) => {
                self.state = SessionState::Committed;
                info!(event = %record.event_name, "Attendance registered");
                Ok(record)
            }
            Err(err) => {
                self.state = SessionState::Failed;
                warn!("Attendance append failed: {err}");
                Err(err)
            }
        }
    }
}
