//! Plain-text result output

use std::borrow::Cow;
use std::io::{self, Write};

/// How fields are decorated and joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    /// Written before and after every non-NULL field
    pub delimiter: String,
    /// Written between fields
    pub separator: String,
    /// Print column names before the first chunk of each result set
    pub header: bool,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            delimiter: String::new(),
            separator: "\t".to_string(),
            header: false,
        }
    }
}

impl OutputFormat {
    /// Column names followed by a `---` rule
    pub fn write_header<W: Write>(&self, out: &mut W, names: &[&str]) -> io::Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                out.write_all(self.separator.as_bytes())?;
            }
            write!(out, "{0}{1}{0}", self.delimiter, name)?;
        }
        writeln!(out)?;
        writeln!(out, "---")
    }

    /// One row; `None` fields print as `NULL` without delimiters
    pub fn write_row<W: Write>(&self, out: &mut W, fields: &[Option<Cow<'_, str>>]) -> io::Result<()> {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.write_all(self.separator.as_bytes())?;
            }
            match field {
                Some(value) => write!(out, "{0}{1}{0}", self.delimiter, value)?,
                None => out.write_all(b"NULL")?,
            }
        }
        writeln!(out)
    }
}

/// Expand `\t`, `\n` and `\\` in user-supplied separators
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(format: &OutputFormat, fields: &[Option<&str>]) -> String {
        let fields: Vec<_> = fields.iter().map(|f| f.map(Cow::Borrowed)).collect();
        let mut out = Vec::new();
        format.write_row(&mut out, &fields).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_default_row() {
        let format = OutputFormat::default();
        assert_eq!(render(&format, &[Some("1"), Some("a")]), "1\ta\n");
    }

    #[test]
    fn test_delimited_row_with_null() {
        let format = OutputFormat {
            delimiter: "'".into(),
            separator: ",".into(),
            header: false,
        };
        assert_eq!(render(&format, &[None, Some("x"), None]), "NULL,'x',NULL\n");
    }

    #[test]
    fn test_header() {
        let format = OutputFormat {
            delimiter: "\"".into(),
            separator: "|".into(),
            header: true,
        };
        let mut out = Vec::new();
        format.write_header(&mut out, &["id", "name"]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"id\"|\"name\"\n---\n");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("\\t"), "\t");
        assert_eq!(unescape("a\\nb"), "a\nb");
        assert_eq!(unescape("\\\\"), "\\");
        assert_eq!(unescape("\\x"), "\\x");
        assert_eq!(unescape(","), ",");
    }
}
