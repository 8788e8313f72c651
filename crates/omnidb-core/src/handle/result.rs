//! Result buffer and cursor
//!
//! Holds the chunk most recently delivered by the backend together with
//! the column metadata of the current result set. The cursor only ever
//! walks the buffered chunk; moving past it requires another `result()`.

use std::borrow::Cow;

use crate::backend::Fetch;
use crate::error::{DbError, DbResult};
use crate::types::{ColumnMeta, ColumnType, ResultStatus, Row, RowStatus, Value};

/// Cursor position inside the current chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Chunk buffered, `row_fetch` not called yet
    BeforeFirst,
    /// On the row at this index of the chunk
    OnRow(usize),
    /// Every row of the chunk has been visited
    ChunkExhausted,
    /// No result set is current (not started, finished or failed)
    Done,
}

/// In-flight result of one query
#[derive(Debug, Clone)]
pub struct ResultSet {
    columns: Vec<ColumnMeta>,
    rows: Vec<Row>,
    cursor: Cursor,
    rows_affected: u64,
    sets_seen: usize,
    chunk_index: usize,
    row_set: bool,
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSet {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            cursor: Cursor::Done,
            rows_affected: 0,
            sets_seen: 0,
            chunk_index: 0,
            row_set: false,
        }
    }

    /// Fold one backend delivery into the buffer
    pub fn apply(&mut self, fetch: Fetch) -> DbResult<ResultStatus> {
        match fetch {
            Fetch::Timeout => Ok(ResultStatus::Timeout),
            Fetch::NoRows { rows_affected } => {
                self.start_set(Vec::new(), false);
                self.rows_affected = rows_affected;
                self.cursor = Cursor::ChunkExhausted;
                Ok(ResultStatus::NoRows)
            }
            Fetch::Rows {
                columns: Some(columns),
                rows,
            } => {
                self.start_set(columns, true);
                self.rows = rows;
                Ok(ResultStatus::Rows)
            }
            Fetch::Rows {
                columns: None,
                rows,
            } => {
                if !self.row_set || self.cursor == Cursor::Done {
                    self.mark_done();
                    return Err(DbError::backend(
                        "backend delivered a continuation chunk without a result set",
                        crate::error::ErrorClass::Unknown,
                    ));
                }
                self.rows = rows;
                self.chunk_index += 1;
                self.cursor = Cursor::BeforeFirst;
                Ok(ResultStatus::Rows)
            }
            Fetch::Done => {
                self.mark_done();
                Ok(ResultStatus::Done)
            }
        }
    }

    fn start_set(&mut self, columns: Vec<ColumnMeta>, row_set: bool) {
        self.columns = columns;
        self.rows.clear();
        self.rows_affected = 0;
        self.sets_seen += 1;
        self.chunk_index = 0;
        self.row_set = row_set;
        self.cursor = Cursor::BeforeFirst;
    }

    /// Drop buffered rows and leave no result set current
    pub fn mark_done(&mut self) {
        self.columns.clear();
        self.rows.clear();
        self.row_set = false;
        self.cursor = Cursor::Done;
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// True while a result set (rows or a completed statement) is current
    pub fn is_current(&self) -> bool {
        self.cursor != Cursor::Done
    }

    fn require_current(&self, what: &str) -> DbResult<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(DbError::usage(format!(
                "{} requires a current result set",
                what
            )))
        }
    }

    fn current_row(&self, what: &str) -> DbResult<&Row> {
        match self.cursor {
            Cursor::OnRow(idx) => Ok(&self.rows[idx]),
            _ => Err(DbError::usage(format!(
                "{} requires the cursor to be on a row",
                what
            ))),
        }
    }

    /// Advance to the next row of the chunk
    pub fn row_fetch(&mut self) -> DbResult<RowStatus> {
        self.require_current("row_fetch")?;
        let next = match self.cursor {
            Cursor::BeforeFirst => 0,
            Cursor::OnRow(idx) => idx + 1,
            _ => self.rows.len(),
        };
        if next < self.rows.len() {
            self.cursor = Cursor::OnRow(next);
            Ok(RowStatus::Row)
        } else {
            self.cursor = Cursor::ChunkExhausted;
            Ok(RowStatus::Done)
        }
    }

    /// Rows changed by the last completed statement (0 for row sets)
    pub fn rows_affected(&self) -> DbResult<u64> {
        self.require_current("rows_affected")?;
        Ok(self.rows_affected)
    }

    /// Zero-based index of the chunk within the current result set
    pub fn chunk_index(&self) -> DbResult<usize> {
        self.require_current("chunk_index")?;
        Ok(self.chunk_index)
    }

    /// Zero-based index of the current result set within the query
    pub fn set_index(&self) -> DbResult<usize> {
        self.require_current("set_index")?;
        Ok(self.sets_seen.saturating_sub(1))
    }

    /// Rows buffered in the current chunk
    pub fn chunk_len(&self) -> DbResult<usize> {
        self.require_current("chunk_len")?;
        Ok(self.rows.len())
    }

    pub fn column_count(&self) -> DbResult<usize> {
        self.require_current("column_count")?;
        Ok(self.columns.len())
    }

    fn column(&self, pos: usize) -> DbResult<&ColumnMeta> {
        self.require_current("column access")?;
        self.columns
            .get(pos)
            .ok_or_else(|| DbError::index(pos, self.columns.len()))
    }

    pub fn column_name(&self, pos: usize) -> DbResult<&str> {
        Ok(&self.column(pos)?.name)
    }

    pub fn column_type(&self, pos: usize) -> DbResult<ColumnType> {
        Ok(self.column(pos)?.column_type)
    }

    pub fn columns(&self) -> DbResult<&[ColumnMeta]> {
        self.require_current("column access")?;
        Ok(&self.columns)
    }

    /// Typed value of a field on the current row
    pub fn field(&self, pos: usize) -> DbResult<&Value> {
        let row = self.current_row("field access")?;
        row.get(pos).ok_or_else(|| DbError::index(pos, row.len()))
    }

    pub fn field_isnull(&self, pos: usize) -> DbResult<bool> {
        Ok(self.field(pos)?.is_null())
    }

    pub fn field_length(&self, pos: usize) -> DbResult<usize> {
        Ok(self.field(pos)?.byte_len())
    }

    /// Textual rendering of a field, `None` for NULL
    pub fn field_value(&self, pos: usize) -> DbResult<Option<Cow<'_, str>>> {
        Ok(self.field(pos)?.to_text())
    }
}
