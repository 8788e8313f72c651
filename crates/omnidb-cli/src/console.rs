//! Diagnostic output for the shell

use colored::*;
use std::io::{self, IsTerminal, Write};

/// Writes warnings, errors and verbose notes to stderr (or any writer)
pub struct Console<E: Write = io::Stderr> {
    out: E,
    verbose: bool,
    color: bool,
}

impl Console {
    /// Console on stderr, colored when stderr is a terminal
    pub fn stderr(verbose: bool) -> Self {
        let color = io::stderr().is_terminal();
        Self::new(io::stderr(), verbose, color)
    }
}

impl<E: Write> Console<E> {
    pub const fn new(out: E, verbose: bool, color: bool) -> Self {
        Self {
            out,
            verbose,
            color,
        }
    }

    /// Recoverable problem; the session continues
    pub fn warn(&mut self, message: &str) -> io::Result<()> {
        let label = if self.color {
            "Warning:".yellow().bold().to_string()
        } else {
            "Warning:".to_string()
        };
        writeln!(self.out, "{} {}", label, message)
    }

    /// Failure that ends the program
    pub fn error(&mut self, message: &str) -> io::Result<()> {
        let label = if self.color {
            "Error:".red().bold().to_string()
        } else {
            "Error:".to_string()
        };
        writeln!(self.out, "{} {}", label, message)
    }

    /// Only shown with `--verbose`
    pub fn info(&mut self, message: &str) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        if self.color {
            writeln!(self.out, "{}", message.dimmed())
        } else {
            writeln!(self.out, "{}", message)
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> E {
        self.out
    }
}
