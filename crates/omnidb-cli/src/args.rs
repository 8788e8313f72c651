//! CLI argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "omnidb-sql")]
#[command(about = "Read and execute semicolon-terminated SQL statements from stdin")]
#[command(
    long_about = r#"Read and execute semicolon-terminated SQL statements from stdin

USAGE:
  omnidb-sql -c db.toml < script.sql       # run a script
  omnidb-sql -c db.toml -i                 # interactive shell
  omnidb-sql -c db.toml -i -k sql.words    # custom completion keywords
  omnidb-sql -c db.toml -s ',' -d '"'      # CSV-like output

Lines starting with '.' are shell commands; type .help in the shell."#
)]
#[command(version)]
pub struct Cli {
    /// Read connection configuration from file
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    /// Start/end delimiter for fields in output
    #[arg(short = 'd', long = "delimiter", default_value = "")]
    pub delimiter: String,

    /// Separator between fields in output
    #[arg(short = 's', long = "separator", default_value = "\t")]
    pub separator: String,

    /// Interactive mode: prompts and column headers
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,

    /// SQL keyword file for tab completion in interactive mode
    #[arg(short = 'k', long = "keywords")]
    pub keywords: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["omnidb-sql", "-c", "db.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("db.toml"));
        assert_eq!(cli.delimiter, "");
        assert_eq!(cli.separator, "\t");
        assert!(!cli.interactive);
        assert!(cli.keywords.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["omnidb-sql", "-i"]).is_err());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "omnidb-sql",
            "--config",
            "x.toml",
            "-d",
            "'",
            "-s",
            ",",
            "-i",
            "-k",
            "sql.words",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.delimiter, "'");
        assert_eq!(cli.separator, ",");
        assert!(cli.interactive);
        assert_eq!(cli.keywords, Some(PathBuf::from("sql.words")));
        assert!(cli.verbose);
    }
}
