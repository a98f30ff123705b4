use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sqlblob", version, about = "Run SQL against a SQLite snapshot kept in a blob store")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "FILE", env = "SQLBLOB_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output; repeat for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one statement and print its rows as JSON lines
    Query {
        sql: String,
        /// Positional parameter as a JSON value; repeat in order
        #[arg(short, long = "param", value_name = "JSON")]
        params: Vec<String>,
        /// Named parameter; the prefix (`:`, `@`, `$`) may be left out
        #[arg(short, long = "named", value_name = "NAME=JSON", conflicts_with = "params")]
        named: Vec<String>,
    },
    /// Run statements from stdin, one per line, through a single handle
    Shell,
    /// Write the current snapshot image to a file
    Dump {
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from(["sqlblob", "-vv", "query", "SELECT ?", "-p", "1", "-p", "\"two\""]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Query { sql, params, named } => {
                assert_eq!(sql, "SELECT ?");
                assert_eq!(params, ["1", "\"two\""]);
                assert!(named.is_empty());
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_positional_and_named_conflict() {
        let result = Cli::try_parse_from(["sqlblob", "query", "SELECT :a", "-p", "1", "-n", "a=1"]);
        assert!(result.is_err());
    }
}
