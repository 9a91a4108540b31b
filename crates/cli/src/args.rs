use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "smsbook",
    version,
    about = "Turn pasted mobile-money and bank SMS into reviewable transactions."
)]
pub struct Cli {
    /// File holding one or more pasted messages (default: stdin)
    pub file: Option<PathBuf>,

    /// Engine config (default: <config dir>/smsbook/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// JSON array of already-recorded transactions; matches are deselected
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Deselect a transaction by id (repeatable)
    #[arg(long = "deselect", value_name = "ID")]
    pub deselect: Vec<String>,

    /// Print only the selected transactions
    #[arg(long)]
    pub selected_only: bool,

    /// Abort parsing after this many milliseconds
    #[arg(long, value_name = "N")]
    pub timeout_ms: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
