//! Shared test infrastructure for integration tests.
//!
//! Builds a throwaway TauDEM install of shell scripts that record each call
//! and exit with a configurable status.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Every executable the pipeline may invoke.
pub const TOOLS: [&str; 13] = [
    "pitremove",
    "d8flowdir",
    "dinfflowdir",
    "aread8",
    "areadinf",
    "gridnet",
    "peukerdouglas",
    "gagewatershed",
    "moveoutletstostreams",
    "dropanalysis",
    "threshold",
    "streamnet",
    "connectdown",
];

/// One recorded tool call: executable name and argument count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub tool: String,
    pub argc: usize,
}

/// Fake tool directory plus a project directory holding a DEM.
pub struct FakeTauDem {
    _root: TempDir,
    pub tool_dir: PathBuf,
    pub project_dir: PathBuf,
    state_dir: PathBuf,
}

impl FakeTauDem {
    /// Install every tool as a succeeding script and create `{dem}.tif`.
    ///
    /// The project directory name contains a space so argument splitting
    /// problems show up as wrong argument counts.
    pub fn new(dem: &str) -> anyhow::Result<Self> {
        let root = TempDir::new()?;
        let tool_dir = root.path().join("taudem");
        let project_dir = root.path().join("my project");
        let state_dir = root.path().join("state");
        fs::create_dir_all(&tool_dir)?;
        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(&state_dir)?;
        fs::write(project_dir.join(format!("{dem}.tif")), b"")?;

        let fake = Self {
            _root: root,
            tool_dir,
            project_dir,
            state_dir,
        };
        for tool in TOOLS {
            fake.install(tool, 0)?;
        }
        Ok(fake)
    }

    /// Replace `tool` with a script that prints to both streams and exits
    /// with `code`.
    pub fn fail_tool(&self, tool: &str, code: i32) -> anyhow::Result<()> {
        self.install(tool, code)
    }

    fn install(&self, tool: &str, code: i32) -> anyhow::Result<()> {
        let calls = self.calls_path();
        let mut script = format!(
            "#!/bin/sh\necho \"$(basename \"$0\") $#\" >> '{}'\n",
            calls.display()
        );
        if code == 0 {
            script.push_str(&format!("echo \"{tool} done\"\n"));
        } else {
            script.push_str(&format!(
                "echo \"stdout from {tool}\"\necho \"stderr from {tool}\" >&2\n"
            ));
        }
        script.push_str(&format!("exit {code}\n"));

        let path = self.tool_dir.join(tool);
        fs::write(&path, script.as_bytes())?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    fn calls_path(&self) -> PathBuf {
        self.state_dir.join("calls.log")
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        let Ok(text) = fs::read_to_string(self.calls_path()) else {
            return Vec::new();
        };
        text.lines()
            .filter_map(|line| {
                let (tool, argc) = line.rsplit_once(' ')?;
                Some(Call {
                    tool: tool.to_string(),
                    argc: argc.parse().ok()?,
                })
            })
            .collect()
    }

    pub fn tools_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.tool).collect()
    }

    #[allow(dead_code)]
    pub fn error_log(&self) -> PathBuf {
        self.project_dir.join("error.log")
    }

    #[allow(dead_code)]
    pub fn project(&self) -> &Path {
        &self.project_dir
    }
}
