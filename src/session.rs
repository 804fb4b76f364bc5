//! Session configuration for one delineation project.
//!
//! A session pins the TauDEM install, the project directory and the DEM base
//! name. It is validated once by [`Session::initialize`] and read-only after
//! that; every path a tool touches is derived from it.
use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Last tool in the pipeline; its presence marks a usable tool directory.
pub const SENTINEL_TOOL: &str = "streamnet";

/// File name of the append-only failure log inside the project directory.
pub const ERROR_LOG_NAME: &str = "error.log";

/// Extension of the input DEM raster.
pub const DEM_EXT: &str = "tif";

/// Reasons a session cannot be initialized.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tool directory {} does not contain {}", .0.display(), SENTINEL_TOOL)]
    ToolDirInvalid(PathBuf),
    #[error("project directory {} does not exist", .0.display())]
    ProjectDirMissing(PathBuf),
    #[error("DEM {} not found", .0.display())]
    DemMissing(PathBuf),
}

/// Validated tool directory, project directory and DEM base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    tool_dir: PathBuf,
    project_dir: PathBuf,
    dem: String,
}

impl Session {
    /// Validate the three session inputs and build a ready session.
    ///
    /// Checks run in order (tool directory, project directory, DEM) and the
    /// first failing one is reported. Empty values fail the check for their
    /// own field.
    pub fn initialize(
        tool_dir: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
        dem: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let tool_dir = tool_dir.into();
        let project_dir = project_dir.into();
        let dem = dem.into();

        if tool_dir.as_os_str().is_empty() || !contains_tool(&tool_dir, SENTINEL_TOOL) {
            return Err(ConfigError::ToolDirInvalid(tool_dir));
        }
        if project_dir.as_os_str().is_empty() || !project_dir.is_dir() {
            return Err(ConfigError::ProjectDirMissing(project_dir));
        }
        let dem_path = project_dir.join(format!("{dem}.{DEM_EXT}"));
        if dem.is_empty() || !dem_path.is_file() {
            return Err(ConfigError::DemMissing(dem_path));
        }

        tracing::debug!(
            tool_dir = %tool_dir.display(),
            project_dir = %project_dir.display(),
            dem = %dem,
            "session initialized"
        );
        Ok(Self {
            tool_dir,
            project_dir,
            dem,
        })
    }

    /// Build a session without touching the filesystem.
    #[cfg(test)]
    pub(crate) fn unchecked(tool_dir: &str, project_dir: &str, dem: &str) -> Self {
        Self {
            tool_dir: PathBuf::from(tool_dir),
            project_dir: PathBuf::from(project_dir),
            dem: dem.to_string(),
        }
    }

    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// DEM base name, without directory or extension.
    pub fn dem(&self) -> &str {
        &self.dem
    }

    pub fn dem_path(&self) -> PathBuf {
        self.project_dir.join(format!("{}.{DEM_EXT}", self.dem))
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.project_dir.join(ERROR_LOG_NAME)
    }

    /// Resolve a tool executable inside the tool directory.
    ///
    /// Falls back to the plain joined path when the tool cannot be found, so
    /// the launch itself reports the problem.
    pub fn tool_path(&self, tool: &str) -> PathBuf {
        which::which_in(tool, Some(self.tool_dir.as_os_str()), &self.tool_dir)
            .unwrap_or_else(|_| self.tool_dir.join(tool))
    }
}

fn contains_tool(dir: &Path, name: &str) -> bool {
    if dir.join(name).is_file() {
        return true;
    }
    !EXE_SUFFIX.is_empty() && dir.join(format!("{name}{EXE_SUFFIX}")).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tool_dir_with_streamnet() -> TempDir {
        let dir = TempDir::new().expect("create tool dir");
        fs::write(dir.path().join(SENTINEL_TOOL), b"").expect("write tool");
        dir
    }

    fn project_with_dem(dem: &str) -> TempDir {
        let dir = TempDir::new().expect("create project dir");
        fs::write(dir.path().join(format!("{dem}.tif")), b"").expect("write dem");
        dir
    }

    #[test]
    fn initialize_accepts_complete_setup() {
        let tools = tool_dir_with_streamnet();
        let project = project_with_dem("dem");

        let session = Session::initialize(tools.path(), project.path(), "dem").expect("ready");
        assert_eq!(session.tool_dir(), tools.path());
        assert_eq!(session.project_dir(), project.path());
        assert_eq!(session.dem(), "dem");
        assert_eq!(session.dem_path(), project.path().join("dem.tif"));
        assert_eq!(session.error_log_path(), project.path().join("error.log"));
    }

    #[test]
    fn initialize_rejects_tool_dir_without_streamnet() {
        let tools = TempDir::new().expect("create tool dir");
        fs::write(tools.path().join("pitremove"), b"").expect("write tool");
        let project = project_with_dem("dem");

        let err = Session::initialize(tools.path(), project.path(), "dem").unwrap_err();
        assert_eq!(err, ConfigError::ToolDirInvalid(tools.path().to_path_buf()));
    }

    #[test]
    fn initialize_rejects_missing_project_dir() {
        let tools = tool_dir_with_streamnet();
        let missing = tools.path().join("no-such-project");

        let err = Session::initialize(tools.path(), &missing, "dem").unwrap_err();
        assert_eq!(err, ConfigError::ProjectDirMissing(missing));
    }

    #[test]
    fn initialize_rejects_missing_dem() {
        let tools = tool_dir_with_streamnet();
        let project = project_with_dem("other");

        let err = Session::initialize(tools.path(), project.path(), "dem").unwrap_err();
        assert_eq!(err, ConfigError::DemMissing(project.path().join("dem.tif")));
    }

    #[test]
    fn initialize_rejects_empty_values() {
        let tools = tool_dir_with_streamnet();
        let project = project_with_dem("dem");

        assert!(matches!(
            Session::initialize("", project.path(), "dem"),
            Err(ConfigError::ToolDirInvalid(_))
        ));
        assert!(matches!(
            Session::initialize(tools.path(), "", "dem"),
            Err(ConfigError::ProjectDirMissing(_))
        ));
        assert!(matches!(
            Session::initialize(tools.path(), project.path(), ""),
            Err(ConfigError::DemMissing(_))
        ));
    }

    #[test]
    fn tool_path_falls_back_to_joined_path() {
        let session = Session::unchecked("/nonexistent/taudem", "/p", "n");
        assert_eq!(
            session.tool_path("pitremove"),
            PathBuf::from("/nonexistent/taudem/pitremove")
        );
    }
}
