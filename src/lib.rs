//! Sequential driver for the TauDEM command-line tools.
//!
//! The crate does no terrain analysis itself. It validates a project
//! [`Session`], builds each tool's argument list, runs the tools one at a time
//! and stops at the first failing stage, leaving diagnostics in the project's
//! `error.log`.
pub mod args;
pub mod config;
pub mod exec;
pub mod orchestrator;
pub mod session;
pub mod steps;

pub use exec::{ProcessRunner, StepInvocation, StepOutcome, ToolRunner};
pub use orchestrator::{DelineateOptions, Delineator, PipelineError, StageRecord, OK_MESSAGE};
pub use session::{ConfigError, Session};
pub use steps::{Stage, StageParams, SNAPPED_OUTLET};
