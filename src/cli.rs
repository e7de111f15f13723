//! Command line definitions.

use crate::fill::OutputMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "formfill",
    version,
    about = "Discover PDF form fields, then fill, flatten and merge them from JSON"
)]
pub struct Cli {
    /// Configuration file (default: ./formfill.toml when present).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the input PDFs and write mapping.json and data.json.
    Discover,

    /// Print the field names of every input PDF.
    List,

    /// Fill the PDFs from data.json and write flattened output.
    Fill(FillArgs),
}

#[derive(Args, Debug, Default)]
pub struct FillArgs {
    /// Save every filled PDF separately instead of merging them.
    #[arg(long, visible_alias = "no-flatten")]
    pub keep_forms: bool,
}

impl FillArgs {
    pub fn output_mode(&self) -> OutputMode {
        if self.keep_forms {
            OutputMode::Individual
        } else {
            OutputMode::Merge
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fill_flags() {
        let cli = Cli::parse_from(["formfill", "fill"]);
        let Command::Fill(args) = cli.command else {
            panic!("expected fill");
        };
        assert_eq!(args.output_mode(), OutputMode::Merge);

        for flag in ["--keep-forms", "--no-flatten"] {
            let cli = Cli::parse_from(["formfill", "fill", flag]);
            let Command::Fill(args) = cli.command else {
                panic!("expected fill");
            };
            assert_eq!(args.output_mode(), OutputMode::Individual);
        }
    }

    #[test]
    fn test_global_config_option() {
        let cli = Cli::parse_from(["formfill", "discover", "--config", "alt.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(matches!(cli.command, Command::Discover));
    }
}
