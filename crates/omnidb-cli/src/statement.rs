//! Accumulates input lines into complete statements

use omnidb_core::sql;

/// Buffer for a statement spread over several input lines
#[derive(Debug, Default)]
pub struct StatementBuffer {
    text: String,
}

impl StatementBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no statement is in progress
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Add a line. Returns the statement text without its terminator once
    /// the buffer holds a complete statement.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);

        if sql::is_complete(&self.text) {
            let text = std::mem::take(&mut self.text);
            Some(sql::strip_terminator(&text).to_string())
        } else {
            None
        }
    }

    /// Drop whatever is buffered, returning it
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let mut buffer = StatementBuffer::new();
        assert_eq!(buffer.push_line("SELECT 1;").as_deref(), Some("SELECT 1"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_continuation_lines() {
        let mut buffer = StatementBuffer::new();
        assert_eq!(buffer.push_line("SELECT a,"), None);
        assert_eq!(buffer.push_line("  b FROM t"), None);
        assert!(!buffer.is_empty());
        assert_eq!(
            buffer.push_line("WHERE a = ';';").as_deref(),
            Some("SELECT a,\n  b FROM t\nWHERE a = ';'")
        );
    }

    #[test]
    fn test_semicolon_inside_quote_does_not_terminate() {
        let mut buffer = StatementBuffer::new();
        assert_eq!(buffer.push_line("INSERT INTO t VALUES ('a;"), None);
        assert_eq!(
            buffer.push_line("b');").as_deref(),
            Some("INSERT INTO t VALUES ('a;\nb')")
        );
    }

    #[test]
    fn test_multiple_statements_on_one_line() {
        let mut buffer = StatementBuffer::new();
        assert_eq!(
            buffer.push_line("SELECT 1; SELECT 2;").as_deref(),
            Some("SELECT 1; SELECT 2")
        );
    }

    #[test]
    fn test_take_discards() {
        let mut buffer = StatementBuffer::new();
        buffer.push_line("SELECT");
        assert_eq!(buffer.take(), "SELECT");
        assert!(buffer.is_empty());
    }
}
