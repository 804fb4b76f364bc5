//! Fixed-order delineation pipeline.
//!
//! [`Delineator`] owns a session and a [`ToolRunner`]. Stages run strictly one
//! after another; the first stage that does not exit with 0 ends the run and
//! is reported by name. Files written by earlier stages stay on disk.
use crate::exec::{ProcessRunner, StepOutcome, ToolRunner};
use crate::session::{ConfigError, Session};
use crate::steps::{Stage, StageParams, SNAPPED_OUTLET};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Message returned by a run in which every stage succeeded.
pub const OK_MESSAGE: &str = "OK!";

/// Stages every run executes, in order, before the outlet branch.
pub const TRUNK_STAGES: [Stage; 9] = [
    Stage::PitRemove,
    Stage::D8FlowDir,
    Stage::DinfFlowDir,
    Stage::AreaD8,
    Stage::AreaDinf,
    Stage::GridNet,
    Stage::PeukerDouglas,
    Stage::AreaD8Outlets,
    Stage::Threshold,
];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    #[error("session is not initialized; call initialize first")]
    NotInitialized,
    #[error("{stage} failed with {outcome}")]
    StageFailed { stage: Stage, outcome: StepOutcome },
    #[error("outlet file may not be named {} when moving outlets to streams", SNAPPED_OUTLET)]
    ReservedOutletName,
    #[error("{stage} requires a {parameter} value")]
    MissingParameter {
        stage: Stage,
        parameter: &'static str,
    },
}

/// Per-run inputs to [`Delineator::auto_delineate`].
#[derive(Debug, Clone, PartialEq)]
pub struct DelineateOptions {
    pub threshold: f64,
    pub outlet: Option<String>,
    pub move_outlet: bool,
    pub max_move_distance: Option<u32>,
}

impl DelineateOptions {
    /// Whole-basin delineation at `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            outlet: None,
            move_outlet: false,
            max_move_distance: None,
        }
    }

    pub fn with_outlet(mut self, outlet: impl Into<String>) -> Self {
        self.outlet = Some(outlet.into());
        self
    }

    pub fn move_outlet(mut self, move_outlet: bool) -> Self {
        self.move_outlet = move_outlet;
        self
    }
}

/// One executed stage and how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StepOutcome,
    pub elapsed_ms: u128,
}

/// Runs TauDEM stages for one project session.
#[derive(Debug)]
pub struct Delineator<R = ProcessRunner> {
    runner: R,
    session: Option<Session>,
    history: Vec<StageRecord>,
}

impl Delineator<ProcessRunner> {
    /// Delineator that launches real processes, with no session yet.
    pub fn new() -> Self {
        Self::with_runner(ProcessRunner)
    }
}

impl Default for Delineator<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ToolRunner> Delineator<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            session: None,
            history: Vec::new(),
        }
    }

    pub fn with_session(session: Session, runner: R) -> Self {
        Self {
            runner,
            session: Some(session),
            history: Vec::new(),
        }
    }

    /// Validate and install a session. A failed call leaves any previous
    /// session in place.
    pub fn initialize(
        &mut self,
        tool_dir: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
        dem: impl Into<String>,
    ) -> Result<&Session, ConfigError> {
        let session = Session::initialize(tool_dir, project_dir, dem)?;
        Ok(&*self.session.insert(session))
    }

    pub fn session(&self) -> Result<&Session, PipelineError> {
        self.session.as_ref().ok_or(PipelineError::NotInitialized)
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Stages executed by the most recent run, including a failing one.
    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    /// Run a single stage and return its outcome unchanged.
    pub fn run_stage(
        &mut self,
        stage: Stage,
        params: &StageParams,
    ) -> Result<StepOutcome, PipelineError> {
        let session = self.session.as_ref().ok_or(PipelineError::NotInitialized)?;
        let invocation = stage.invocation(session, params)?;

        tracing::info!(stage = stage.name(), "stage started");
        let start = Instant::now();
        let outcome = self.runner.run(session, &invocation);
        let elapsed_ms = start.elapsed().as_millis();

        if outcome.is_success() {
            tracing::info!(stage = stage.name(), elapsed_ms, "stage finished");
        } else {
            tracing::warn!(
                stage = stage.name(),
                elapsed_ms,
                outcome = %outcome,
                "stage failed"
            );
        }
        self.history.push(StageRecord {
            stage,
            outcome: outcome.clone(),
            elapsed_ms,
        });
        Ok(outcome)
    }

    /// Run the full pipeline, stopping at the first failing stage.
    ///
    /// With an outlet and `move_outlet`, the outlet is snapped to the stream
    /// raster and the network and drop analysis use the snapped copy. With an
    /// outlet alone the network is built against `Outlet.shp`. Without an
    /// outlet the whole basin is delineated.
    pub fn auto_delineate(&mut self, options: &DelineateOptions) -> Result<(), PipelineError> {
        self.session()?;
        self.history.clear();

        let outlet = options.outlet.as_deref();
        if options.move_outlet && outlet == Some(SNAPPED_OUTLET) {
            return Err(PipelineError::ReservedOutletName);
        }
        if options.move_outlet && outlet.is_none() {
            tracing::warn!("move_outlet ignored without an outlet; delineating whole basin");
        }

        let params = StageParams {
            threshold: Some(options.threshold),
            outlet: options.outlet.clone(),
            max_move_distance: options.max_move_distance,
        };
        for stage in TRUNK_STAGES {
            self.checked_stage(stage, &params)?;
        }

        let snapped = StageParams {
            outlet: Some(SNAPPED_OUTLET.to_string()),
            ..params.clone()
        };
        match (outlet, options.move_outlet) {
            (Some(_), true) => {
                self.checked_stage(Stage::MoveOutletsToStreams, &params)?;
                self.checked_stage(Stage::StreamNet, &snapped)?;
                self.checked_stage(Stage::DropAnalysis, &snapped)?;
            }
            (Some(_), false) => self.checked_stage(Stage::StreamNet, &snapped)?,
            (None, _) => self.checked_stage(Stage::StreamNet, &params)?,
        }

        tracing::info!(stages = self.history.len(), "delineation complete");
        Ok(())
    }

    /// [`Self::auto_delineate`] reduced to `"OK!"` or a one-line failure.
    pub fn auto_delineate_message(&mut self, options: &DelineateOptions) -> String {
        match self.auto_delineate(options) {
            Ok(()) => OK_MESSAGE.to_string(),
            Err(err) => err.to_string(),
        }
    }

    fn checked_stage(&mut self, stage: Stage, params: &StageParams) -> Result<(), PipelineError> {
        let outcome = self.run_stage(stage, params)?;
        if outcome.is_success() {
            Ok(())
        } else {
            Err(PipelineError::StageFailed { stage, outcome })
        }
    }
}
