use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cem",
    author,
    version,
    about = "Multi-year capacity expansion runs",
    long_about = None
)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate a scenario file
    Validate {
        /// Scenario file (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        config: PathBuf,
    },
    /// Render the data command file for one year without solving
    Template {
        #[arg(value_hint = ValueHint::FilePath)]
        config: PathBuf,
        /// Investment year to render
        #[arg(long)]
        year: u32,
        /// Directory holding earlier years' carry-forward artifacts
        #[arg(long, value_hint = ValueHint::DirPath)]
        workdir: Option<PathBuf>,
        /// Use the truncated three-day time window
        #[arg(long)]
        fast: bool,
        /// Write to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Solve every year of a scenario and write the final report
    Run(RunArgs),
    /// Aggregate persisted per-year results of an earlier run
    Merge {
        #[arg(value_hint = ValueHint::FilePath)]
        config: PathBuf,
        /// Working directory of the earlier run
        #[arg(long, value_hint = ValueHint::DirPath)]
        workdir: PathBuf,
        /// Solver label recorded in the report metadata
        #[arg(long, default_value = "unknown")]
        solver_name: String,
        /// Report path (defaults to the scenario file with a .json extension)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    pub config: PathBuf,
    /// Solver plugin executable
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub solver: PathBuf,
    /// Extra argument passed to the solver plugin (repeatable)
    #[arg(long = "solver-arg", allow_hyphen_values = true)]
    pub solver_args: Vec<String>,
    /// Solver label recorded in the report metadata
    #[arg(long)]
    pub solver_name: Option<String>,
    /// Working directory for per-year artifacts (default: fresh temp dir)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub workdir: Option<PathBuf>,
    /// Force the clustered capacity pre-solve on
    #[arg(long, conflicts_with = "no_cluster")]
    pub cluster: bool,
    /// Force the clustered capacity pre-solve off
    #[arg(long)]
    pub no_cluster: bool,
    /// Number of representative periods for clustering
    #[arg(long)]
    pub clusters: Option<u32>,
    /// Use the truncated three-day time window
    #[arg(long)]
    pub fast: bool,
    /// Report path (defaults to the scenario file with a .json extension)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
}
