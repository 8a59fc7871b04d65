//! Command-line argument definitions.

use clap::{Parser, Subcommand};
use kntable_arrow::Sentinel;
use std::path::PathBuf;

use super::OutputFormat;

/// Inspect KNIME table schemas and Arrow files.
#[derive(Parser, Debug)]
#[command(name = "kntable")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format for stdout
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a wire schema document and print the schema
    Schema {
        /// Wire schema JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Read an Arrow IPC file and print its logical schema
    Arrow {
        /// Arrow IPC file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Integer value standing for missing values: min, max or a number
        #[arg(long = "sentinel", value_name = "SENTINEL", value_parser = parse_sentinel)]
        sentinel: Option<Sentinel>,

        /// The writer has not finished the file yet
        #[arg(long = "unfinished")]
        unfinished: bool,
    },

    /// List registered logical types
    Types,
}

fn parse_sentinel(s: &str) -> Result<Sentinel, String> {
    s.parse().map_err(|e: kntable_arrow::BridgeError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arrow_command() {
        let args =
            Args::try_parse_from(["kntable", "-vv", "arrow", "t.arrow", "--sentinel", "min"])
                .unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Arrow {
                file,
                sentinel,
                unfinished,
            } => {
                assert_eq!(file, PathBuf::from("t.arrow"));
                assert_eq!(sentinel, Some(Sentinel::Min));
                assert!(!unfinished);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bad_sentinel_is_rejected() {
        let r = Args::try_parse_from(["kntable", "arrow", "t.arrow", "--sentinel", "lots"]);
        assert!(r.is_err());
    }

    #[test]
    fn test_format_is_global() {
        let args = Args::try_parse_from(["kntable", "schema", "s.json", "--format", "json"]).unwrap();
        assert_eq!(args.format, OutputFormat::Json);
    }
}
