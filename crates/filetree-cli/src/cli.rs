use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use filetree::FileFormat;

#[derive(Parser)]
#[command(
    name = "filetree",
    about = "Inspect and maintain filetree record stores",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new store
    Init(InitArgs),
    /// Show a store's configuration and size
    Info(InfoArgs),
    /// Print one record
    Get(GetArgs),
    /// Append payload files as new records
    Insert(InsertArgs),
    /// List record indices and their data files
    Ls(LsArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub root: PathBuf,
    /// Payload format: rows, columnar, csv, json, toml or bincode
    #[arg(long)]
    pub format: FileFormat,
    /// Index bits per directory level
    #[arg(long, default_value_t = 7)]
    pub leaf_depth: u32,
    /// Initial directory levels above the leaves
    #[arg(long, default_value_t = 2)]
    pub tree_depth: u32,
    /// Keep no metadata side-files
    #[arg(long)]
    pub no_metadata: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    pub root: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    pub root: PathBuf,
    /// Record index; negative values count from the end
    #[arg(allow_hyphen_values = true)]
    pub index: i64,
    /// Print the metadata side-record instead of the payload
    #[arg(long)]
    pub metadata: bool,
    /// Stream the raw payload file bytes instead of a rendered view
    #[arg(long, conflicts_with = "metadata")]
    pub raw: bool,
}

#[derive(Args)]
pub struct InsertArgs {
    pub root: PathBuf,
    /// Files already serialized in the store's payload format
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct LsArgs {
    pub root: PathBuf,
    #[arg(long, allow_hyphen_values = true)]
    pub start: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    pub stop: Option<i64>,
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    pub step: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["filetree", "init", "/tmp/store", "--format", "json"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.format, FileFormat::Json);
            assert_eq!(args.leaf_depth, 7);
            assert_eq!(args.tree_depth, 2);
            assert!(!args.no_metadata);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn init_requires_a_format() {
        assert!(Cli::try_parse_from(["filetree", "init", "/tmp/store"]).is_err());
        assert!(Cli::try_parse_from(["filetree", "init", "/tmp/store", "--format", "pickle"]).is_err());
    }

    #[test]
    fn parse_init_shape_flags() {
        let cli = Cli::try_parse_from([
            "filetree", "init", "/s", "--format", "columnar", "--leaf-depth", "4",
            "--tree-depth", "3", "--no-metadata",
        ])
        .unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.format, FileFormat::Columnar);
            assert_eq!(args.leaf_depth, 4);
            assert_eq!(args.tree_depth, 3);
            assert!(args.no_metadata);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_get_negative_index() {
        let cli = Cli::try_parse_from(["filetree", "get", "/s", "-1"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert_eq!(args.index, -1);
            assert!(!args.metadata);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn get_raw_conflicts_with_metadata() {
        assert!(Cli::try_parse_from(["filetree", "get", "/s", "0", "--raw", "--metadata"]).is_err());
    }

    #[test]
    fn parse_insert_files() {
        let cli = Cli::try_parse_from(["filetree", "insert", "/s", "a.json", "b.json"]).unwrap();
        if let Command::Insert(args) = cli.command {
            assert_eq!(args.files.len(), 2);
        } else {
            panic!("wrong command");
        }
        assert!(Cli::try_parse_from(["filetree", "insert", "/s"]).is_err());
    }

    #[test]
    fn parse_ls_bounds() {
        let cli = Cli::try_parse_from([
            "filetree", "ls", "/s", "--start", "-4", "--step", "-2",
        ])
        .unwrap();
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.start, Some(-4));
            assert_eq!(args.stop, None);
            assert_eq!(args.step, -2);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["filetree", "--verbose", "info", "/s"]).unwrap();
        assert!(cli.verbose);
    }
}
