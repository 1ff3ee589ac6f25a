use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "xlmeta",
    about = "Inspect erasure-coded object metadata records",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log decoder activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a whole record and list its journal
    Inspect(InspectArgs),
    /// Read a single journal entry without decoding the rest
    Entry(EntryArgs),
    /// Decode a record and check every entry's invariants
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct EntryArgs {
    pub file: PathBuf,
    /// Journal position; negative counts from the end
    #[arg(short, long, default_value_t = -1, allow_hyphen_values = true)]
    pub index: i64,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_defaults_to_latest() {
        let cli = Cli::try_parse_from(["xlmeta", "entry", "xl.meta"]).unwrap();
        match cli.command {
            Command::Entry(args) => {
                assert_eq!(args.index, -1);
                assert_eq!(args.file, PathBuf::from("xl.meta"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.verbose);
    }

    #[test]
    fn entry_accepts_negative_index() {
        let cli = Cli::try_parse_from(["xlmeta", "entry", "xl.meta", "--index", "-3"]).unwrap();
        let Command::Entry(args) = cli.command else {
            panic!("expected entry");
        };
        assert_eq!(args.index, -3);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["xlmeta", "inspect", "xl.meta", "--format", "json", "-v"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Inspect(_)));
    }

    #[test]
    fn file_is_required() {
        assert!(Cli::try_parse_from(["xlmeta", "verify"]).is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        assert!(Cli::try_parse_from(["xlmeta", "--format", "yaml", "inspect", "f"]).is_err());
    }
}
