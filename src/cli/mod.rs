//! Command-line definition

pub mod orchestration;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "scmver",
    version,
    about = "Compute package versions from source-control metadata",
    infer_subcommands = true
)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the repository state
    Stat(StatArgs),

    /// Print the next version
    Next(NextArgs),

    /// Write a version file
    Generate(GenerateArgs),

    /// Print a value from a generated version file
    Load(LoadArgs),
}

/// Where to look for a repository and how to probe it
#[derive(Debug, Clone, Default, Args)]
pub struct ProbeArgs {
    #[arg(default_value = ".", help = "Directory inside the working copy")]
    pub path: PathBuf,

    #[arg(
        short = 'o',
        long = "option",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Backend option such as git.tag=v*"
    )]
    pub options: Vec<(String, String)>,

    #[arg(long, value_name = "MARKER", help = "Ignore working copies with this marker")]
    pub disable: Vec<String>,
}

/// How to turn the repository state into a version
#[derive(Debug, Clone, Default, Args)]
pub struct VersionArgs {
    #[arg(short, long, help = "Segment to bump when past the tag")]
    pub spec: Option<String>,

    #[arg(short, long, help = "Local version template used when dirty")]
    pub local: Option<String>,

    #[arg(
        short = 'v',
        long = "regex",
        value_name = "REGEX",
        help = "Regex with a version group extracting the version from the tag"
    )]
    pub regex: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct StatArgs {
    #[command(flatten)]
    pub probe: ProbeArgs,
}

#[derive(Debug, Clone, Default, Args)]
pub struct NextArgs {
    #[command(flatten)]
    pub probe: ProbeArgs,

    #[command(flatten)]
    pub version: VersionArgs,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GenerateArgs {
    #[arg(help = "Version file to write")]
    pub file: PathBuf,

    #[command(flatten)]
    pub probe: ProbeArgs,

    #[command(flatten)]
    pub version: VersionArgs,

    #[arg(short, long, help = r"Template of the file; \n and \t are decoded")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct LoadArgs {
    #[arg(help = "FILE[:ATTR] or MODULE[:ATTR]")]
    pub spec: String,

    #[arg(short, long, default_value = ".", help = "Base directory")]
    pub path: PathBuf,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}
