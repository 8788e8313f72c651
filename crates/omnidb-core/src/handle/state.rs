//! Handle lifecycle states and the operations each one permits

use std::fmt;

/// Lifecycle state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// Transport parameters recorded, not authenticated
    Init,
    /// Authenticated, ready for a query
    Bound,
    /// Query registered, `result()` not called yet
    QueryActive,
    /// At least one `result()` call happened; must be finished
    ResultOpen,
    /// Logged out; may bind again
    Unbound,
    /// Resources released; only error accessors remain usable
    Finished,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Bound => "bound",
            Self::QueryActive => "query-active",
            Self::ResultOpen => "result-open",
            Self::Unbound => "unbound",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Operations guarded by the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Bind,
    Unbind,
    Finish,
    GetOption,
    SetOption,
    Query,
    Result,
    ResultFinish,
    RowFetch,
    RowsAffected,
    ColumnInfo,
    FieldAccess,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bind => "bind",
            Self::Unbind => "unbind",
            Self::Finish => "finish",
            Self::GetOption => "get_option",
            Self::SetOption => "set_option",
            Self::Query => "query",
            Self::Result => "result",
            Self::ResultFinish => "result_finish",
            Self::RowFetch => "row_fetch",
            Self::RowsAffected => "rows_affected",
            Self::ColumnInfo => "column access",
            Self::FieldAccess => "field access",
        };
        f.write_str(name)
    }
}

impl HandleState {
    /// Whether `op` may run in this state
    ///
    /// Cursor-level conditions (a current result set, an on-row cursor) are
    /// checked separately by the result buffer.
    pub fn permits(self, op: Operation) -> bool {
        use HandleState::*;
        use Operation::*;

        match op {
            Bind => matches!(self, Init | Unbound),
            Unbind => matches!(self, Init | Bound | Unbound),
            Finish => true,
            GetOption | SetOption => self != Finished,
            Query => self == Bound,
            Result | ResultFinish => matches!(self, QueryActive | ResultOpen),
            RowFetch | RowsAffected | ColumnInfo | FieldAccess => self == ResultOpen,
        }
    }
}
