//! Shell meta-commands (lines starting with `.`)

use anyhow::{Result, anyhow, bail};
use omnidb_core::OptionId;

use crate::formatter::unescape;

pub const HELP: &str = "\
.help                  Show this list
.quit, .exit           Leave the shell
.header on|off         Print column names before each result set
.delimiter [text]      Text written around every field (\\t and \\n allowed)
.separator <text>      Text written between fields (\\t and \\n allowed)
.backends              List registered backends
.get <option>          Show an option value (name or numeric id)
.set <option> <value>  Change an option value";

/// Parsed meta-command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    Quit,
    Header(bool),
    Delimiter(String),
    Separator(String),
    Backends,
    Get(OptionId),
    Set(OptionId, String),
}

impl MetaCommand {
    /// Parse a line that starts with `.`
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_start();
        let body = line
            .strip_prefix('.')
            .ok_or_else(|| anyhow!("not a command: {}", line))?;
        let (word, rest) = match body.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest),
            None => (body, ""),
        };
        // arguments keep their inner whitespace so ' ' works as a separator
        let rest = rest.trim_end_matches(['\r', '\n']);

        match word {
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "header" => match rest.trim() {
                "on" => Ok(Self::Header(true)),
                "off" => Ok(Self::Header(false)),
                other => bail!("usage: .header on|off (got '{}')", other),
            },
            "delimiter" => Ok(Self::Delimiter(unescape(rest))),
            "separator" => {
                if rest.is_empty() {
                    bail!("usage: .separator <text>");
                }
                Ok(Self::Separator(unescape(rest)))
            }
            "backends" => Ok(Self::Backends),
            "get" => Ok(Self::Get(option_id(rest.trim())?)),
            "set" => {
                let (name, value) = rest
                    .trim()
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("usage: .set <option> <value>"))?;
                Ok(Self::Set(option_id(name)?, value.trim().to_string()))
            }
            other => bail!("unknown command '.{}', use .help", other),
        }
    }
}

fn option_id(name: &str) -> Result<OptionId> {
    if name.is_empty() {
        bail!("option name or id required");
    }
    OptionId::from_name(name).ok_or_else(|| anyhow!("unknown option '{}'", name))
}
