//! Statement loop driving one connected handle

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use omnidb_core::{
    ConnectionConfig, DbError, ErrorClass, Handle, OptionValue, ResultStatus, RowStatus,
    global_registry, sql,
};
use tokio::io::{AsyncBufRead, Lines};

use crate::commands::{HELP, MetaCommand};
use crate::console::Console;
use crate::formatter::OutputFormat;
use crate::statement::StatementBuffer;

const BANNER: &str = "Interactive SQL shell, use .help to list available commands";
const PROMPT: &str = "sql> ";
const CONTINUATION: &str = "  -> ";

/// Where input lines come from
pub trait LineSource {
    /// True when the source shows `prompt` itself
    fn draws_prompt(&self) -> bool {
        false
    }

    /// Next line without its terminator, `None` at end of input
    async fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

impl<R: AsyncBufRead + Unpin> LineSource for Lines<R> {
    async fn next_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

/// Why a session stopped reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// End of input
    Eof,
    /// `.quit` or `.exit`
    Quit,
    /// A permanent failure aborted the session
    Fatal,
}

impl SessionEnd {
    pub fn is_success(self) -> bool {
        self != Self::Fatal
    }
}

enum Failure {
    Db(DbError),
    Io(io::Error),
}

impl From<DbError> for Failure {
    fn from(e: DbError) -> Self {
        Self::Db(e)
    }
}

impl From<io::Error> for Failure {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Reads statements and meta-commands, writes results to `out`
pub struct Session<O: Write, E: Write> {
    handle: Handle,
    format: OutputFormat,
    interactive: bool,
    chunk_size: usize,
    fetch_timeout: Option<Duration>,
    out: O,
    console: Console<E>,
}

impl<O: Write, E: Write> Session<O, E> {
    pub fn new(
        handle: Handle,
        config: &ConnectionConfig,
        format: OutputFormat,
        interactive: bool,
        out: O,
        console: Console<E>,
    ) -> Self {
        Self {
            handle,
            format,
            interactive,
            chunk_size: config.chunk_size,
            fetch_timeout: config.fetch_timeout,
            out,
            console,
        }
    }

    /// Process input until EOF, `.quit` or a permanent failure
    pub async fn run<L: LineSource>(&mut self, mut input: L) -> Result<SessionEnd> {
        let mut buffer = StatementBuffer::new();

        if self.interactive {
            writeln!(self.out, "{}", BANNER)?;
            self.out.flush()?;
        }

        loop {
            let prompt = if buffer.is_empty() { PROMPT } else { CONTINUATION };
            if self.interactive && !input.draws_prompt() {
                write!(self.out, "{}", prompt)?;
                self.out.flush()?;
            }

            let Some(line) = input.next_line(prompt).await? else {
                break;
            };

            if buffer.is_empty() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.starts_with('.') {
                    if self.meta(&line)? {
                        return Ok(SessionEnd::Quit);
                    }
                    continue;
                }
            }

            if let Some(statement) = buffer.push_line(&line) {
                if !self.execute(&statement).await? {
                    return Ok(SessionEnd::Fatal);
                }
            }
        }

        if self.interactive && !input.draws_prompt() {
            writeln!(self.out)?;
        }
        let rest = buffer.take();
        if sql::has_content(&rest) {
            self.console.warn(&format!(
                "discarding incomplete statement at end of input: {}",
                rest.trim()
            ))?;
        }
        Ok(SessionEnd::Eof)
    }

    /// Give the handle back, e.g. to finish it
    pub fn into_handle(self) -> Handle {
        self.handle
    }

    /// Returns true if the session should stop
    fn meta(&mut self, line: &str) -> io::Result<bool> {
        let command = match MetaCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                self.console.warn(&e.to_string())?;
                return Ok(false);
            }
        };
        tracing::debug!(?command, "meta command");

        match command {
            MetaCommand::Help => writeln!(self.out, "{}", HELP)?,
            MetaCommand::Quit => return Ok(true),
            MetaCommand::Header(on) => self.format.header = on,
            MetaCommand::Delimiter(text) => self.format.delimiter = text,
            MetaCommand::Separator(text) => self.format.separator = text,
            MetaCommand::Backends => {
                for name in global_registry().backend_names() {
                    writeln!(self.out, "{}", name)?;
                }
            }
            MetaCommand::Get(id) => match self.handle.get_option(id) {
                Ok(value) => writeln!(self.out, "{} = {}", id, value)?,
                Err(e) => self.console.warn(&e.message())?,
            },
            MetaCommand::Set(id, input) => {
                let outcome = match self.handle.describe_option(id) {
                    Some(spec) => OptionValue::parse(spec.kind, &input)
                        .and_then(|value| self.handle.set_option(id, value)),
                    None => Err(DbError::not_supported(format!(
                        "option {} is not supported by {}",
                        id,
                        self.handle.backend_name()
                    ))),
                };
                if let Err(e) = outcome {
                    self.console.warn(&e.message())?;
                }
            }
        }
        Ok(false)
    }

    /// Run one statement batch. Returns false if the session must end.
    async fn execute(&mut self, statement: &str) -> io::Result<bool> {
        if !sql::has_content(statement) {
            return Ok(true);
        }
        tracing::debug!(statement, "executing");
        if let Err(e) = self.handle.query(statement).await {
            return self.report(&e);
        }

        let streamed = self.stream().await;
        let finished = self.handle.result_finish().await;

        let mut keep_going = match streamed {
            Ok(()) => true,
            Err(Failure::Db(e)) => self.report(&e)?,
            Err(Failure::Io(e)) => return Err(e),
        };
        if let Err(e) = finished {
            keep_going &= self.report(&e)?;
        }
        self.out.flush()?;
        Ok(keep_going)
    }

    async fn stream(&mut self) -> Result<(), Failure> {
        loop {
            match self.handle.result(self.fetch_timeout, self.chunk_size).await? {
                ResultStatus::Done => return Ok(()),
                ResultStatus::Timeout => continue,
                ResultStatus::NoRows => {
                    let affected = self.handle.rows_affected()?;
                    tracing::debug!(rows_affected = affected, "statement done");
                }
                ResultStatus::Rows => self.write_chunk()?,
            }
        }
    }

    fn write_chunk(&mut self) -> Result<(), Failure> {
        let width = self.handle.column_count()?;
        if self.format.header && self.handle.chunk_index()? == 0 {
            let names = (0..width)
                .map(|pos| self.handle.column_name(pos))
                .collect::<Result<Vec<_>, _>>()?;
            self.format.write_header(&mut self.out, &names)?;
        }

        while self.handle.row_fetch()? == RowStatus::Row {
            let fields = (0..width)
                .map(|pos| self.handle.field_value(pos))
                .collect::<Result<Vec<_>, _>>()?;
            self.format.write_row(&mut self.out, &fields)?;
        }
        Ok(())
    }

    /// Warn about a failure; permanent failures end the session
    fn report(&mut self, err: &DbError) -> io::Result<bool> {
        self.console.warn(&err.message())?;
        let fatal = err.class() == ErrorClass::Permanent;
        if fatal {
            tracing::debug!(code = err.error_code(), "permanent failure, ending session");
        }
        Ok(!fatal)
    }
}
