use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::collections::BTreeSet;
use std::env;
use std::process::ExitCode;
use taudem_pipeline::config::{resolve_config, RunConfig};
use taudem_pipeline::{
    DelineateOptions, Delineator, PipelineError, ProcessRunner, Session, Stage, StageParams,
    StageRecord, OK_MESSAGE,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
use cli::{CheckArgs, Command, DelineateArgs, RootArgs, SessionArgs, StepArgs};

/// A stage failed; details are in the project's error.log.
const EXIT_STAGE_FAILED: u8 = 1;
/// The session or run options could not be resolved.
const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Command::Check(args) => cmd_check(args),
        Command::Delineate(args) => cmd_delineate(args),
        Command::Step(args) => cmd_step(args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    if env::var("RUST_LOG").is_err() {
        if let Ok(directive) = format!("taudem_pipeline={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Build the session from flags, falling back to config file values.
fn open_session(args: &SessionArgs) -> Result<(Session, RunConfig)> {
    let config = resolve_config(args.config.as_deref(), &args.project_dir)?;
    let tool_dir = args
        .tool_dir
        .clone()
        .or_else(|| config.tool_dir.clone())
        .ok_or_else(|| anyhow!("--tool-dir is required (or set tool_dir in the config file)"))?;
    let dem = args
        .dem
        .clone()
        .or_else(|| config.dem.clone())
        .ok_or_else(|| anyhow!("--dem is required (or set dem in the config file)"))?;
    let session = Session::initialize(tool_dir, &args.project_dir, dem)?;
    Ok((session, config))
}

fn cmd_check(args: CheckArgs) -> Result<ExitCode> {
    let (session, _) = open_session(&args.session)?;
    println!("tool dir: {}", session.tool_dir().display());
    println!("project dir: {}", session.project_dir().display());
    println!("dem: {}", session.dem_path().display());

    let tools: BTreeSet<&str> = Stage::value_variants()
        .iter()
        .map(|stage| stage.tool())
        .collect();
    let mut missing = 0usize;
    for tool in tools {
        let path = session.tool_path(tool);
        if path.is_file() {
            println!("  {tool}: {}", path.display());
        } else {
            missing += 1;
            println!("  {tool}: missing ({})", path.display());
        }
    }
    if missing > 0 {
        tracing::warn!(missing, "some tools are not installed");
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct RunReport<'a> {
    status: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_log: Option<String>,
    stages: Vec<StageReport>,
}

#[derive(Serialize)]
struct StageReport {
    stage: &'static str,
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    elapsed_ms: u128,
}

impl From<&StageRecord> for StageReport {
    fn from(record: &StageRecord) -> Self {
        Self {
            stage: record.stage.name(),
            outcome: record.outcome.to_string(),
            exit_code: record.outcome.code(),
            elapsed_ms: record.elapsed_ms,
        }
    }
}

fn cmd_delineate(args: DelineateArgs) -> Result<ExitCode> {
    let (session, config) = open_session(&args.session)?;
    let threshold = args
        .threshold
        .or(config.threshold)
        .ok_or_else(|| anyhow!("--threshold is required (or set threshold in the config file)"))?;
    let options = DelineateOptions {
        threshold,
        outlet: args.outlet.or(config.outlet),
        move_outlet: args.move_outlet || config.move_outlet,
        max_move_distance: args.max_move_distance.or(config.max_move_distance),
    };
    let error_log = session.error_log_path();

    let mut delineator = Delineator::with_session(session, ProcessRunner);
    let message = delineator.auto_delineate_message(&options);
    let ok = message == OK_MESSAGE;

    if args.json {
        let report = RunReport {
            status: if ok { "ok" } else { "failed" },
            message: &message,
            error_log: error_log
                .is_file()
                .then(|| error_log.display().to_string()),
            stages: delineator.history().iter().map(StageReport::from).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{message}");
        if !ok && error_log.is_file() {
            eprintln!("see {} for tool output", error_log.display());
        }
    }

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_STAGE_FAILED)
    })
}

fn cmd_step(args: StepArgs) -> Result<ExitCode> {
    let (session, config) = open_session(&args.session)?;
    let params = StageParams {
        threshold: args.threshold.or(config.threshold),
        outlet: args.outlet.or(config.outlet),
        max_move_distance: args.max_move_distance.or(config.max_move_distance),
    };

    let mut delineator = Delineator::with_session(session, ProcessRunner);
    let outcome = delineator.run_stage(args.stage, &params)?;
    if outcome.is_success() {
        println!("{OK_MESSAGE}");
        return Ok(ExitCode::SUCCESS);
    }
    let failure = PipelineError::StageFailed {
        stage: args.stage,
        outcome,
    };
    println!("{failure}");
    Ok(ExitCode::from(EXIT_STAGE_FAILED))
}
