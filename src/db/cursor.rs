//! Result cursor.
//!
//! The cursor keeps the result of the most recent successful execution and hands
//! out its rows as [`Record`]s. Each execution replaces the previous result; rows
//! are consumed in order and never returned twice.

use crate::db::connection::StatementOutcome;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnMetadata, Record};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::Arc;

/// Rows returned by `fetchmany` when no size is given and the arraysize is untouched.
pub const DEFAULT_ARRAYSIZE: usize = 1;

/// Lifecycle of the cursor's current result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing has been executed yet.
    Unexecuted,
    /// An execution scope is running.
    Pending,
    /// The last execution scope failed and was rolled back.
    Failed,
    /// A result is available.
    Ready,
    /// The session was closed.
    Closed,
}

#[derive(Debug)]
pub struct Cursor {
    state: CursorState,
    columns: Arc<[String]>,
    description: Option<Vec<ColumnMetadata>>,
    rows: VecDeque<Vec<JsonValue>>,
    rowcount: i64,
    lastrowid: Option<u64>,
    arraysize: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            state: CursorState::Unexecuted,
            columns: Arc::from(Vec::new()),
            description: None,
            rows: VecDeque::new(),
            rowcount: -1,
            lastrowid: None,
            arraysize: DEFAULT_ARRAYSIZE,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Mark the start of an execution scope. Earlier rows are discarded.
    pub(crate) fn begin(&mut self) {
        self.clear();
        self.state = CursorState::Pending;
    }

    /// Replace the current result with the outcome of a single execution.
    ///
    /// Returns the row count: rows produced for a query, rows affected otherwise.
    pub(crate) fn load(&mut self, outcome: StatementOutcome) -> u64 {
        let rowcount = if outcome.columns.is_some() {
            outcome.rows.len() as u64
        } else {
            outcome.rows_affected
        };
        self.replace(outcome, rowcount);
        rowcount
    }

    /// Replace the current result with the outcome of the last execution in a
    /// batch, reporting the summed row count of the whole batch.
    pub(crate) fn load_batch(&mut self, outcome: StatementOutcome, total_rowcount: u64) {
        self.replace(outcome, total_rowcount);
    }

    fn replace(&mut self, outcome: StatementOutcome, rowcount: u64) {
        self.columns = outcome
            .columns
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        self.description = outcome.columns;
        self.rows = outcome.rows.into();
        self.rowcount = i64::try_from(rowcount).unwrap_or(i64::MAX);
        self.lastrowid = outcome.last_insert_id;
        self.state = CursorState::Ready;
    }

    /// Drop the current result after a failed scope.
    pub(crate) fn invalidate(&mut self) {
        self.clear();
        self.state = CursorState::Failed;
    }

    /// Release the result; every later fetch fails.
    pub(crate) fn close(&mut self) {
        self.clear();
        self.state = CursorState::Closed;
    }

    fn clear(&mut self) {
        self.columns = Arc::from(Vec::new());
        self.description = None;
        self.rows.clear();
        self.rowcount = -1;
        self.lastrowid = None;
    }

    fn ensure_ready(&self) -> DbResult<()> {
        match self.state {
            CursorState::Ready => Ok(()),
            CursorState::Unexecuted => Err(DbError::state("No statement has been executed yet")),
            CursorState::Pending => Err(DbError::state(
                "Cannot fetch while an execution scope is still running",
            )),
            CursorState::Failed => Err(DbError::state(
                "The last execution failed and was rolled back; there is no result to fetch",
            )),
            CursorState::Closed => Err(DbError::state("The session is closed")),
        }
    }

    fn next_record(&mut self) -> Option<Record> {
        self.rows
            .pop_front()
            .map(|values| Record::new(Arc::clone(&self.columns), values))
    }

    /// Next unconsumed row, or `None` when the result is exhausted (or had no rows).
    pub fn fetchone(&mut self) -> DbResult<Option<Record>> {
        self.ensure_ready()?;
        Ok(self.next_record())
    }

    /// Up to `size` unconsumed rows (the arraysize when `None`).
    pub fn fetchmany(&mut self, size: Option<usize>) -> DbResult<Vec<Record>> {
        self.ensure_ready()?;
        let size = size.unwrap_or(self.arraysize).min(self.rows.len());
        Ok((0..size).filter_map(|_| self.next_record()).collect())
    }

    /// All remaining rows.
    pub fn fetchall(&mut self) -> DbResult<Vec<Record>> {
        self.ensure_ready()?;
        let columns = Arc::clone(&self.columns);
        Ok(self
            .rows
            .drain(..)
            .map(|values| Record::new(Arc::clone(&columns), values))
            .collect())
    }

    /// Column description of the current result; `None` for statements without rows.
    pub fn description(&self) -> Option<&[ColumnMetadata]> {
        self.description.as_deref()
    }

    /// Rows produced (SELECT) or affected (DML) by the last execution, `-1` when unknown.
    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    /// Auto-increment id generated by the last execution, if any.
    pub fn lastrowid(&self) -> Option<u64> {
        self.lastrowid
    }

    /// Rows left to fetch in the current result.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    /// Set the default `fetchmany` size. Zero is treated as one.
    pub fn set_arraysize(&mut self, size: usize) {
        self.arraysize = size.max(1);
    }
}
