use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::classify::FileCategory;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Create a new .arcx container from a directory tree.
    #[command(alias = "c")]
    Create {
        /// The source directory to archive.
        #[arg(required = true)]
        input: PathBuf,

        /// The path for the output container file (e.g. assets.arcx).
        #[arg(short, long)]
        output: PathBuf,

        /// Zstandard compression level (1-22) applied uniformly to every
        /// category, overriding category defaults.
        #[arg(long)]
        level: Option<i32>,

        /// Override one category's default level, e.g. `--category-level
        /// texture=8`. Repeatable. Beaten by --level when both are given.
        #[arg(long = "category-level", value_name = "CATEGORY=LEVEL", value_parser = parse_category_level)]
        category_levels: Vec<(FileCategory, i32)>,

        /// Number of parallel worker threads. [0 = auto-detect based on CPU cores]
        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Zero the creation timestamp so repeat builds of the same tree are
        /// byte-identical.
        #[arg(long)]
        deterministic: bool,

        /// Show a live progress line on stderr.
        #[arg(long)]
        progress: bool,

        /// Write the full run report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write a failures-only JSON error log to this path.
        #[arg(long)]
        error_log: Option<PathBuf>,
    },

    /// Extract a container into a directory.
    #[command(alias = "x")]
    Extract {
        /// The container file to extract.
        #[arg(required = true)]
        archive: PathBuf,

        /// The directory where the tree will be restored.
        #[arg(short, long)]
        output: PathBuf,

        /// Number of parallel worker threads. [0 = auto-detect based on CPU cores]
        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Show a live progress line on stderr.
        #[arg(long)]
        progress: bool,

        /// Write the full run report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write a failures-only JSON error log to this path.
        #[arg(long)]
        error_log: Option<PathBuf>,
    },

    /// List the contents of a container without extracting it.
    #[command(alias = "l")]
    List {
        /// The container file to list.
        #[arg(required = true)]
        archive: PathBuf,
    },

    /// Scan a directory and print per-category statistics without archiving.
    Scan {
        /// The directory to scan.
        #[arg(required = true)]
        input: PathBuf,
    },
}

/// Parse a `CATEGORY=LEVEL` pair for `--category-level`.
fn parse_category_level(s: &str) -> Result<(FileCategory, i32), String> {
    let (cat, level) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=LEVEL, got '{s}'"))?;
    let category: FileCategory = cat.parse()?;
    let level: i32 = level
        .parse()
        .map_err(|_| format!("'{level}' is not a valid level"))?;
    Ok((category, level))
}

/// Parses command-line arguments using `clap` and returns the command to execute.
pub fn run() -> Result<Commands, Box<dyn std::error::Error>> {
    let args = Args::parse();
    Ok(args.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_level_pairs_parse() {
        assert_eq!(
            parse_category_level("texture=8").unwrap(),
            (FileCategory::Texture, 8)
        );
        assert_eq!(
            parse_category_level("SCRIPT=15").unwrap(),
            (FileCategory::Script, 15)
        );
        assert!(parse_category_level("texture").is_err());
        assert!(parse_category_level("sound=3").is_err());
        assert!(parse_category_level("audio=loud").is_err());
    }
}
