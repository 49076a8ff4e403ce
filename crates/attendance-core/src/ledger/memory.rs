//! In-process ledger for dry runs and tests.

use super::{AttendanceRecord, Ledger, LedgerFactory, Row, KEY_COLUMNS};
use crate::error::Result;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Rows kept in memory. Clones share the same rows, so a handle kept by the
/// caller sees appends made through the one handed to the flow.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    rows: Rc<RefCell<Vec<Row>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Rc::new(RefCell::new(rows)),
        }
    }

    /// Snapshot of the current rows
    #[must_use]
    pub fn rows(&self) -> Vec<Row> {
        self.rows.borrow().clone()
    }
}

impl Ledger for MemoryLedger {
    fn read_all(&self) -> Result<Vec<Row>> {
        Ok(self.rows())
    }

    fn read_key_columns(&self) -> Result<Vec<Row>> {
        debug!("Reading {KEY_COLUMNS} from memory ledger");
        Ok(self
            .rows
            .borrow()
            .iter()
            .map(|row| row.iter().take(2).cloned().collect())
            .collect())
    }

    fn append(&self, record: &AttendanceRecord) -> Result<()> {
        self.rows.borrow_mut().push(record.to_row());
        Ok(())
    }
}

impl LedgerFactory for MemoryLedger {
    type Ledger = MemoryLedger;

    fn open(&self) -> Result<MemoryLedger> {
        Ok(self.clone())
    }
}
