//! # attendance-core
//!
//! Location-gated, once-per-day attendance registration.
//!
//! A caller may register attendance when all of the following hold:
//!
//! - their public IP geolocates within [`geo::MAX_DISTANCE_KM`] of the campus
//! - the calendar file has an event on today's date
//! - the ledger has no row for their identity hash and today's date
//!
//! Each registration appends one row to a spreadsheet tab:
//!
//! | Column | Value |
//! |--------|-------|
//! | A | SHA-256 hex of the caller's IP |
//! | B | Date, `YYYY-MM-DD` |
//! | C | Display name |
//! | D | Event name |
//!
//! ## Quick Start
//!
//! ```no_run
//! use attendance_core::{Config, NetworkLocator, Notice, RegistrationFlow, SheetsLedgerFactory};
//!
//! let config = Config::load(&attendance_core::config::default_config_path()?)?;
//! let flow = RegistrationFlow::new(
//!     NetworkLocator::new(&config),
//!     SheetsLedgerFactory::new(&config),
//! );
//!
//! match flow.begin() {
//!     Ok(mut session) => {
//!         let record = session.submit_name("Ana")?;
//!         println!("{}", Notice::registered(&record).text);
//!     }
//!     Err(err) => println!("{}", Notice::for_error(&err).text),
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`geo`] - coordinates and great-circle distance
//! - [`locator`] - caller IP discovery and IP geolocation
//! - [`calendar`] - event dates from `calendar.ics`
//! - [`ledger`] - the attendance spreadsheet and an in-memory stand-in
//! - [`flow`] - the registration state machine
//! - [`message`] - user-facing text for each outcome

pub mod calendar;
pub mod config;
pub mod error;
pub mod flow;
pub mod geo;
pub mod identity;
pub mod ledger;
pub mod locator;
pub mod message;

pub use calendar::{event_for_date, load_events, parse_calendar, CalendarEvent};
pub use config::Config;
pub use error::{CalendarError, CredentialsError, LocationError, RegistrationError, Result};
pub use flow::{RegistrationFlow, Session, SessionState};
pub use geo::{distance_km, Coordinate};
pub use identity::IdentityHash;
pub use ledger::{AttendanceRecord, Ledger, LedgerFactory, MemoryLedger, SheetsLedgerFactory};
pub use locator::{Locator, NetworkLocator};
pub use message::{Notice, Severity};
