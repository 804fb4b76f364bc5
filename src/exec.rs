//! Tool execution and failure logging.
//!
//! A tool runs exactly once with its output captured. When it does not exit
//! cleanly the captured output is appended to the project's `error.log`,
//! followed by the command line that produced it.
use crate::args::{ArgList, ArgToken};
use crate::session::Session;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::Instant;

/// First trailer line written after a failed tool's output.
pub const ERROR_LOG_TRAILER: &str = "THE PREVIOUS OUTPUT WAS PRODUCED BY THE FOLLOWING";

/// How a tool invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The process exited with this status code; 0 is success.
    Exited(i32),
    /// The process was terminated by a signal.
    Signaled,
    /// The process could not be started.
    LaunchFailed(String),
}

impl StepOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::Exited(code),
            None => Self::Signaled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "{code}"),
            Self::Signaled => write!(f, "terminated by signal"),
            Self::LaunchFailed(err) => write!(f, "launch error: {err}"),
        }
    }
}

/// A tool name with its fully built arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInvocation {
    tool: &'static str,
    args: ArgList,
}

impl StepInvocation {
    pub fn new(tool: &'static str) -> Self {
        Self {
            tool,
            args: ArgList::new(),
        }
    }

    pub fn arg(mut self, token: ArgToken) -> Self {
        self.args.push(token);
        self
    }

    pub fn opt_arg(mut self, token: Option<ArgToken>) -> Self {
        self.args.push_opt(token);
        self
    }

    pub fn tool(&self) -> &'static str {
        self.tool
    }

    pub fn args(&self) -> &ArgList {
        &self.args
    }

    /// Shell-quoted command line for logs; never executed through a shell.
    pub fn command_line(&self, program: &Path) -> String {
        let mut parts = Vec::with_capacity(self.args.tokens().len() * 2 + 1);
        parts.push(program.display().to_string());
        parts.extend(self.args.to_display_args());
        shell_words::join(parts)
    }
}

impl fmt::Display for StepInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tool, self.args)
    }
}

/// Runs one tool invocation to completion.
///
/// The orchestrator only distinguishes success from anything else; the
/// outcome is returned unchanged.
pub trait ToolRunner {
    fn run(&mut self, session: &Session, invocation: &StepInvocation) -> StepOutcome;
}

/// Launches tools as child processes of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&mut self, session: &Session, invocation: &StepInvocation) -> StepOutcome {
        let program = session.tool_path(invocation.tool());
        let command_line = invocation.command_line(&program);
        tracing::debug!(command = %command_line, "launching tool");

        let start = Instant::now();
        let output = Command::new(&program)
            .args(invocation.args().to_os_args())
            .output();
        let elapsed_ms = start.elapsed().as_millis();

        let outcome = match output {
            Ok(output) => {
                let outcome = StepOutcome::from_status(output.status);
                if !outcome.is_success() {
                    let mut captured = output.stdout;
                    captured.extend_from_slice(&output.stderr);
                    record_failure(session, &captured, &command_line);
                }
                outcome
            }
            Err(err) => {
                let message = err.to_string();
                let captured = format!("failed to launch {}: {message}\n", program.display());
                record_failure(session, captured.as_bytes(), &command_line);
                StepOutcome::LaunchFailed(message)
            }
        };

        tracing::info!(
            tool = invocation.tool(),
            elapsed_ms,
            outcome = %outcome,
            "tool finished"
        );
        outcome
    }
}

fn record_failure(session: &Session, captured: &[u8], command_line: &str) {
    let path = session.error_log_path();
    if let Err(err) = append_error_log(&path, captured, command_line) {
        tracing::warn!(
            path = %path.display(),
            error = %err,
            "could not append to error log"
        );
    }
}

/// Append captured output and its provenance trailer to the error log.
pub fn append_error_log(path: &Path, captured: &[u8], command_line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(captured)?;
    write!(file, "\n\n {ERROR_LOG_TRAILER} \n{command_line}\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::file_arg;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn outcome_display_matches_failure_messages() {
        assert_eq!(StepOutcome::Exited(3).to_string(), "3");
        assert_eq!(StepOutcome::Signaled.to_string(), "terminated by signal");
        assert_eq!(
            StepOutcome::LaunchFailed("No such file or directory".to_string()).to_string(),
            "launch error: No such file or directory"
        );
        assert!(StepOutcome::Exited(0).is_success());
        assert!(!StepOutcome::Exited(1).is_success());
        assert!(!StepOutcome::Signaled.is_success());
        assert_eq!(StepOutcome::Exited(7).code(), Some(7));
        assert_eq!(StepOutcome::Signaled.code(), None);
    }

    #[test]
    fn command_line_quotes_unsafe_paths() {
        let session = Session::unchecked("/tools", "/my project", "n");
        let invocation = StepInvocation::new("pitremove").arg(file_arg(&session, "fel").build());
        assert_eq!(
            invocation.command_line(&PathBuf::from("/tools/pitremove")),
            "/tools/pitremove -fel '/my project/nfel.tif'"
        );
        assert_eq!(invocation.to_string(), "pitremove -fel /my project/nfel.tif");
    }

    #[test]
    fn append_error_log_accumulates_blocks() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("error.log");

        append_error_log(&path, b"first failure\n", "/tools/a -x 1").expect("append");
        append_error_log(&path, b"second failure\n", "/tools/b -y 2").expect("append");

        let text = fs::read_to_string(&path).expect("read log");
        assert_eq!(
            text,
            "first failure\n\n\n THE PREVIOUS OUTPUT WAS PRODUCED BY THE FOLLOWING \n/tools/a -x 1\n\
             second failure\n\n\n THE PREVIOUS OUTPUT WAS PRODUCED BY THE FOLLOWING \n/tools/b -y 2\n"
        );
    }

    #[test]
    fn launch_failure_is_reported_and_logged() {
        let tools = TempDir::new().expect("tool dir");
        let project = TempDir::new().expect("project dir");
        let session = Session::unchecked(
            tools.path().to_str().expect("utf-8 path"),
            project.path().to_str().expect("utf-8 path"),
            "dem",
        );
        let invocation = StepInvocation::new("pitremove");

        let outcome = ProcessRunner.run(&session, &invocation);
        assert!(matches!(outcome, StepOutcome::LaunchFailed(_)));

        let log = fs::read_to_string(session.error_log_path()).expect("error log written");
        assert!(log.contains("failed to launch"));
        assert!(log.contains(ERROR_LOG_TRAILER));
    }
}
