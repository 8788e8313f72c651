//! Line editing with SQL keyword completion for terminal sessions

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context as _, Result};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use crate::session::LineSource;

/// Used when no keyword file is given
const DEFAULT_KEYWORDS: &[&str] = &[
    "ALTER", "AND", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE", "COMMIT", "COUNT", "CREATE",
    "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FROM", "GROUP", "HAVING",
    "IN", "INDEX", "INNER", "INSERT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NOT",
    "NULL", "OFFSET", "ON", "OR", "ORDER", "PRIMARY", "KEY", "ROLLBACK", "SELECT", "SET",
    "TABLE", "THEN", "TRANSACTION", "UNION", "UNIQUE", "UPDATE", "VALUES", "VIEW", "WHEN",
    "WHERE", "WITH",
];

/// Prefix completion over a fixed keyword list
#[derive(Debug, Clone)]
pub struct KeywordCompleter {
    keywords: Vec<String>,
}

impl Default for KeywordCompleter {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().map(|k| k.to_string()))
    }
}

impl KeywordCompleter {
    pub fn new(keywords: impl IntoIterator<Item = String>) -> Self {
        let mut keywords: Vec<String> = keywords.into_iter().collect();
        keywords.sort();
        keywords.dedup();
        Self { keywords }
    }

    /// Load whitespace-separated keywords from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read keyword file {}", path.display()))?;
        Ok(Self::new(text.split_whitespace().map(str::to_string)))
    }

    /// Start of the word under the cursor and the keywords it prefixes
    pub fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<&str>) {
        let start = line[..pos]
            .rfind(|c: char| !(c.is_alphanumeric() || c == '_'))
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];
        if word.is_empty() {
            return (start, Vec::new());
        }

        let matches = self
            .keywords
            .iter()
            .filter(|kw| {
                kw.len() >= word.len()
                    && kw.is_char_boundary(word.len())
                    && kw[..word.len()].eq_ignore_ascii_case(word)
            })
            .map(String::as_str)
            .collect();
        (start, matches)
    }
}

impl Completer for KeywordCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, matches) = self.candidates(line, pos);
        let pairs = matches
            .into_iter()
            .map(|kw| Pair {
                display: kw.to_string(),
                replacement: kw.to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for KeywordCompleter {
    type Hint = String;
}

impl Highlighter for KeywordCompleter {}

impl Validator for KeywordCompleter {}

impl Helper for KeywordCompleter {}

/// Terminal input through rustyline; draws its own prompts
pub struct EditorInput {
    editor: Editor<KeywordCompleter, DefaultHistory>,
}

impl EditorInput {
    pub fn new(completer: KeywordCompleter) -> Result<Self> {
        let mut editor = Editor::new().context("cannot initialize line editor")?;
        editor.set_helper(Some(completer));
        Ok(Self { editor })
    }
}

impl LineSource for EditorInput {
    fn draws_prompt(&self) -> bool {
        true
    }

    async fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        // the runtime has nothing else to drive while the user types
        let line = tokio::task::block_in_place(|| self.editor.readline(prompt));
        match line {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}
