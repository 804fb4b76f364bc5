//! CLI argument parsing for the delineation driver.
//!
//! The CLI is thin: it resolves a session and run options from flags and the
//! optional config file, then hands off to the library.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use taudem_pipeline::Stage;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "taudem-pipeline",
    version,
    about = "Run TauDEM watershed delineation stages in order",
    after_help = "Examples:\n  taudem-pipeline check --tool-dir /opt/taudem --project-dir ./basin --dem dem\n  taudem-pipeline delineate --tool-dir /opt/taudem --project-dir ./basin --dem dem --threshold 100\n  taudem-pipeline delineate --project-dir ./basin --threshold 100 --outlet gauges --move-outlet\n  taudem-pipeline step d8flowdir --project-dir ./basin",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Emit debug-level logs (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Check(CheckArgs),
    Delineate(DelineateArgs),
    Step(StepArgs),
}

/// Inputs every command needs to build a session.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Directory containing the TauDEM executables
    #[arg(long, value_name = "DIR")]
    pub tool_dir: Option<PathBuf>,

    /// Project directory holding the DEM and all outputs
    #[arg(long, value_name = "DIR")]
    pub project_dir: PathBuf,

    /// DEM base name, without the .tif extension
    #[arg(long, value_name = "NAME")]
    pub dem: Option<String>,

    /// JSON config file (defaults to <project-dir>/taudem.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Validate a session without running any tool.
#[derive(Parser, Debug)]
#[command(about = "Validate the tool directory, project directory and DEM")]
pub struct CheckArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

/// Full pipeline run.
#[derive(Parser, Debug)]
#[command(about = "Run the full delineation pipeline")]
pub struct DelineateArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Contributing-area threshold for stream definition
    #[arg(long, value_name = "N")]
    pub threshold: Option<f64>,

    /// Outlet shapefile basename inside the project directory
    #[arg(long, value_name = "NAME")]
    pub outlet: Option<String>,

    /// Snap the outlet onto the stream raster before building the network
    #[arg(long)]
    pub move_outlet: bool,

    /// Maximum distance in cells an outlet may be moved
    #[arg(long, value_name = "CELLS")]
    pub max_move_distance: Option<u32>,

    /// Emit a machine-readable JSON report
    #[arg(long)]
    pub json: bool,
}

/// Single stage run.
#[derive(Parser, Debug)]
#[command(about = "Run one pipeline stage")]
pub struct StepArgs {
    /// Stage to run
    #[arg(value_enum)]
    pub stage: Stage,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Contributing-area threshold (threshold stage)
    #[arg(long, value_name = "N")]
    pub threshold: Option<f64>,

    /// Outlet shapefile basename inside the project directory
    #[arg(long, value_name = "NAME")]
    pub outlet: Option<String>,

    /// Maximum distance in cells an outlet may be moved
    #[arg(long, value_name = "CELLS")]
    pub max_move_distance: Option<u32>,
}
