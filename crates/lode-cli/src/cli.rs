use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lode",
    about = "lode: content-addressed value store and asset queries",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./lode.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store directory, overriding the configuration
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    /// Value file extension, overriding the configuration
    #[arg(long, global = true)]
    pub ext: Option<String>,

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

#[derive(Subcommand)]
pub enum Command {
    /// List indexed keys
    Keys,
    /// Write a value to stdout
    Get(KeyArgs),
    /// Store a value read from a file or stdin
    Set(SetArgs),
    /// Delete a value
    Cut(KeyArgs),
    /// List keys created at or after a unix timestamp
    CreatedAfter(SinceArgs),
    /// List keys modified at or after a unix timestamp
    ModifiedAfter(ModifiedAfterArgs),
    /// Check the index against the value files
    Vet(VetArgs),
    /// Match keys across assets
    Query(QueryArgs),
    /// Show an asset's values for a key
    Values(ValuesArgs),
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub key: String,
    /// Read the value from this file instead of stdin
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct SinceArgs {
    pub since: i64,
}

#[derive(Args)]
pub struct ModifiedAfterArgs {
    pub since: i64,
    /// Only keys changed after they were created
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct VetArgs {
    /// Repair what is found
    #[arg(long)]
    pub fix: bool,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Clauses as ASSET=TERM; repeat an asset to add terms
    #[arg(required = true)]
    pub clauses: Vec<String>,
    /// Compare values ignoring case
    #[arg(long)]
    pub any_case: bool,
}

#[derive(Args)]
pub struct ValuesArgs {
    pub asset: String,
    pub key: String,
    /// Show stored values without resolving transitions
    #[arg(long)]
    pub raw: bool,
}
