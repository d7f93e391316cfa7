use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "reaf",
    about = "Review and bulk-reaffirm compliance requirement combinations",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum StrategyArg {
    #[default]
    Lookahead,
    Myers,
}

#[derive(Subcommand)]
pub enum Command {
    /// Line diff between two requirement texts
    Diff(DiffArgs),
    /// Show entities, versions and combinations with their status
    Tree(TreeArgs),
    /// Run a bulk reaffirmation over the selected combinations
    Reaffirm(ReaffirmArgs),
}

#[derive(Args)]
pub struct DiffArgs {
    /// File holding the current text
    pub original: PathBuf,
    /// File holding the proposed text
    pub proposed: PathBuf,
    #[arg(long)]
    pub side_by_side: bool,
    #[arg(long, value_enum, default_value = "lookahead")]
    pub strategy: StrategyArg,
}

#[derive(Args)]
pub struct TreeArgs {
    /// JSON seed with `entities` and `combinations`
    #[arg(long)]
    pub data: PathBuf,
    /// Load every entity's combinations
    #[arg(long)]
    pub expand_all: bool,
    /// Only entities matching this search text
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct ReaffirmArgs {
    /// JSON seed with `entities` and `combinations`
    #[arg(long)]
    pub data: PathBuf,
    /// Select every combination of an entity
    #[arg(long = "entity")]
    pub entities: Vec<String>,
    /// Select every combination of a version
    #[arg(long = "version")]
    pub versions: Vec<String>,
    /// Select a single combination
    #[arg(long = "combination")]
    pub combinations: Vec<String>,
    /// Reaffirm with a replacement requirement, as TITLE:TEXT
    #[arg(long)]
    pub with_changes: Option<String>,
    #[arg(long)]
    pub comment: String,
    #[arg(long)]
    pub actor: Option<String>,
    /// Make the repository reject these combinations
    #[arg(long = "fail")]
    pub fail: Vec<String>,
    /// Cancel the run after this many processed items
    #[arg(long)]
    pub cancel_after: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reaffirm_selection() {
        let cli = Cli::try_parse_from([
            "reaf",
            "reaffirm",
            "--data",
            "seed.json",
            "--entity",
            "acme",
            "--combination",
            "g1",
            "--combination",
            "g2",
            "--comment",
            "annual",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Reaffirm(args) => {
                assert_eq!(args.entities, vec!["acme"]);
                assert_eq!(args.combinations, vec!["g1", "g2"]);
                assert!(args.with_changes.is_none());
            }
            _ => panic!("expected reaffirm"),
        }
    }

    #[test]
    fn reaffirm_requires_comment() {
        assert!(Cli::try_parse_from(["reaf", "reaffirm", "--data", "seed.json"]).is_err());
    }

    #[test]
    fn diff_strategy_flag() {
        let cli = Cli::try_parse_from(["reaf", "diff", "a.txt", "b.txt", "--strategy", "myers"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Diff(DiffArgs {
                strategy: StrategyArg::Myers,
                ..
            })
        ));
    }
}
