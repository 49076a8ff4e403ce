//! Attendance ledger: a remote table of `(identity, date, name, event)` rows.
//!
//! Uniqueness of `(identity, date)` is checked by scanning rows before an
//! append. Nothing on the storage side enforces it, so two processes that
//! both pass the check can both append. That race is accepted.

pub mod auth;
pub mod memory;
pub mod sheets;

use crate::error::Result;
use crate::identity::IdentityHash;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use memory::MemoryLedger;
pub use sheets::{SheetsLedger, SheetsLedgerFactory};

/// Tab of the spreadsheet that holds attendance rows
pub const SHEET_NAME: &str = "Página1";

/// Columns holding identity hash and date
pub const KEY_COLUMNS: &str = "A:B";

/// One ledger row: text cells in column order
pub type Row = Vec<String>;

/// Format a date the way the ledger stores it
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// A single registration, in ledger column order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub identity_hash: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub display_name: String,
    pub event_name: String,
}

impl AttendanceRecord {
    pub fn new(
        identity: &IdentityHash,
        date: NaiveDate,
        display_name: impl Into<String>,
        event_name: impl Into<String>,
    ) -> Self {
        Self {
            identity_hash: identity.as_str().to_string(),
            date: date_key(date),
            display_name: display_name.into(),
            event_name: event_name.into(),
        }
    }

    #[must_use]
    pub fn to_row(&self) -> Row {
        vec![
            self.identity_hash.clone(),
            self.date.clone(),
            self.display_name.clone(),
            self.event_name.clone(),
        ]
    }
}

/// Tabular store of attendance rows
pub trait Ledger {
    /// Every row in the tab
    fn read_all(&self) -> Result<Vec<Row>>;

    /// Every row, restricted to [`KEY_COLUMNS`]
    fn read_key_columns(&self) -> Result<Vec<Row>>;

    /// Append one row; visible to other readers immediately
    fn append(&self, record: &AttendanceRecord) -> Result<()>;

    /// Whether a row for `identity_hash` on `date` already exists
    fn has_registered_today(&self, identity_hash: &str, date: &str) -> Result<bool> {
        let rows = self.read_key_columns()?;
        Ok(contains_registration(&rows, identity_hash, date))
    }
}

/// Opens a ledger handle, authenticating if needed
pub trait LedgerFactory {
    type Ledger: Ledger;

    fn open(&self) -> Result<Self::Ledger>;
}

/// Exact, case-sensitive scan over the first two cells of each row.
/// Rows with fewer than two cells never match.
#[must_use]
pub fn contains_registration(rows: &[Row], identity_hash: &str, date: &str) -> bool {
    rows.iter().any(|row| match row.as_slice() {
        [hash, day, ..] => hash == identity_hash && day == date,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Row> {
        data.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect()
    }

    #[test]
    fn test_zero_rows_never_registered() {
        assert!(!contains_registration(&[], "abc123", "2024-03-01"));
        assert!(!contains_registration(&[], "", ""));
    }

    #[test]
    fn test_matches_hash_and_date() {
        let ledger = rows(&[&["abc123", "2024-03-01"], &["def456", "2024-03-01"]]);
        assert!(contains_registration(&ledger, "abc123", "2024-03-01"));
        assert!(contains_registration(&ledger, "def456", "2024-03-01"));
        assert!(!contains_registration(&ledger, "abc123", "2024-03-02"));
        assert!(!contains_registration(&ledger, "zzz999", "2024-03-01"));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let ledger = rows(&[&["ABC123", "2024-03-01"]]);
        assert!(!contains_registration(&ledger, "abc123", "2024-03-01"));
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let ledger = rows(&[&[], &["abc123"], &["abc123", "2024-03-01", "Ana", "Seminar"]]);
        assert!(contains_registration(&ledger, "abc123", "2024-03-01"));
        assert!(!contains_registration(&rows(&[&["abc123"]]), "abc123", ""));
    }

    #[test]
    fn test_record_row_order() {
        let identity = IdentityHash::from_address("10.0.0.1");
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let record = AttendanceRecord::new(&identity, date, "Ana", "Seminar");
        assert_eq!(
            record.to_row(),
            vec![
                identity.as_str().to_string(),
                "2024-03-01".to_string(),
                "Ana".to_string(),
                "Seminar".to_string(),
            ]
        );
    }

    #[test]
    fn test_date_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert_eq!(date_key(date), "2025-01-09");
    }
}
