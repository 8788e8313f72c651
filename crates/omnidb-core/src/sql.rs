//! Lexical statement splitting
//!
//! Only enough lexing to find statement terminators: quoted strings and
//! identifiers, bracketed identifiers and both comment styles are skipped.
//! No parsing or validation happens here.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Normal,
    Quoted(u8),
    LineComment,
    BlockComment,
}

/// Walks `text` and reports each top-level `;` offset plus whether the
/// scan ended in the middle of a quote or block comment.
fn scan(text: &str, mut on_terminator: impl FnMut(usize)) -> Lex {
    let bytes = text.as_bytes();
    let mut state = Lex::Normal;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            Lex::Normal => match b {
                b'\'' | b'"' | b'`' => state = Lex::Quoted(b),
                b'[' => state = Lex::Quoted(b']'),
                b'-' if next == Some(b'-') => {
                    state = Lex::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = Lex::BlockComment;
                    i += 1;
                }
                b';' => on_terminator(i),
                _ => {}
            },
            Lex::Quoted(close) => {
                if b == close {
                    state = Lex::Normal;
                }
            }
            Lex::LineComment => {
                if b == b'\n' {
                    state = Lex::Normal;
                }
            }
            Lex::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    state = Lex::Normal;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    state
}

/// True if `text` holds anything besides whitespace and comments
pub fn has_content(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1).copied()) {
            (b'-', Some(b'-')) => match text[i..].find('\n') {
                Some(off) => i += off + 1,
                None => return false,
            },
            (b'/', Some(b'*')) => match text[i + 2..].find("*/") {
                Some(off) => i += off + 4,
                None => return false,
            },
            (b, _) if b.is_ascii_whitespace() => i += 1,
            _ => return true,
        }
    }
    false
}

/// Split a multi-statement text at top-level semicolons
///
/// Returned pieces are trimmed and exclude the terminator. Pieces that are
/// empty or consist only of comments are dropped.
pub fn split_statements(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    scan(text, |end| {
        pieces.push(&text[start..end]);
        start = end + 1;
    });
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .filter(|piece| has_content(piece))
        .map(str::trim)
        .collect()
}

/// True if `text` ends with a top-level `;`, ignoring trailing whitespace
/// and comments, and no quote or block comment is left open
pub fn is_complete(text: &str) -> bool {
    let mut last_terminator = None;
    let state = scan(text, |end| last_terminator = Some(end));
    if matches!(state, Lex::Quoted(_) | Lex::BlockComment) {
        return false;
    }
    match last_terminator {
        Some(end) => !has_content(&text[end + 1..]),
        None => false,
    }
}

/// Remove the final top-level terminator of a complete statement text
pub fn strip_terminator(text: &str) -> &str {
    let mut last_terminator = None;
    scan(text, |end| last_terminator = Some(end));
    match last_terminator {
        Some(end) if !has_content(&text[end + 1..]) => text[..end].trim_end(),
        _ => text.trim_end(),
    }
}
