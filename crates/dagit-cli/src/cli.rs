use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dagit",
    about = "Inspect a git object store and export it as a graph",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository location: a working tree or a bare store
    #[arg(short, long, global = true, default_value = ".")]
    pub repo: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with repository settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Worker threads for scanning and snapshots (0 = all cores)
    #[arg(long, global = true)]
    pub workers: Option<usize>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show one object, or the whole snapshot when no id is given
    Show(ShowArgs),
    /// Write the graph snapshot document
    Graph(GraphArgs),
    /// Poll the store and rescan when it changes
    Watch(WatchArgs),
    /// Count objects by kind
    Stats,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Full 40-character object id
    pub id: Option<String>,
    /// Print only the object's kind
    #[arg(short = 't', long = "type")]
    pub kind_only: bool,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between polls
    #[arg(short, long, default_value = "2")]
    pub interval: u64,
    /// Print the full snapshot after every refresh
    #[arg(long)]
    pub print: bool,
}
