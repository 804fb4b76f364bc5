//! Optional JSON run configuration.
//!
//! Values here are defaults; command-line flags always win. The file is looked
//! up from an explicit path, then `taudem.json` in the project directory, then
//! the user config directory.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name inside a project directory.
pub const PROJECT_CONFIG_NAME: &str = "taudem.json";

/// Directory under the user config dir holding `config.json`.
pub const USER_CONFIG_DIR: &str = "taudem-pipeline";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlet: Option<String>,
    #[serde(default)]
    pub move_outlet: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_move_distance: Option<u32>,
}

/// Load a config file.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: RunConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Persist a config in a stable pretty-printed form.
pub fn write_config(path: &Path, config: &RunConfig) -> Result<()> {
    let text = serde_json::to_string_pretty(config).context("serialize config")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Candidate config paths in lookup order.
pub fn config_candidates(explicit: Option<&Path>, project_dir: &Path) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    let mut candidates = vec![project_dir.join(PROJECT_CONFIG_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(USER_CONFIG_DIR).join("config.json"));
    }
    candidates
}

/// Resolve the effective config.
///
/// An explicit path must exist; implicit locations are skipped when absent.
/// No file at all yields the empty default.
pub fn resolve_config(explicit: Option<&Path>, project_dir: &Path) -> Result<RunConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    for candidate in config_candidates(None, project_dir) {
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using config file");
            return load_config(&candidate);
        }
    }
    Ok(RunConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolve_config_prefers_project_file() {
        let project = TempDir::new().expect("project dir");
        let config = RunConfig {
            tool_dir: Some(PathBuf::from("/opt/taudem")),
            dem: Some("dem".to_string()),
            threshold: Some(250.0),
            outlet: Some("gauges".to_string()),
            move_outlet: true,
            max_move_distance: Some(10),
        };
        write_config(&project.path().join(PROJECT_CONFIG_NAME), &config).expect("write");

        let resolved = resolve_config(None, project.path()).expect("resolve");
        assert_eq!(resolved, config);
    }

    #[test]
    fn explicit_config_must_exist() {
        let project = TempDir::new().expect("project dir");
        let missing = project.path().join("missing.json");
        let err = resolve_config(Some(&missing), project.path()).unwrap_err();
        assert!(err.to_string().contains("read config"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let project = TempDir::new().expect("project dir");
        let path = project.path().join("run.json");
        fs::write(&path, br#"{"tool_dir": "/opt/taudem", "thresh": 10}"#).expect("write");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let project = TempDir::new().expect("project dir");
        let path = project.path().join("run.json");
        fs::write(&path, br#"{"dem": "basin"}"#).expect("write");

        let config = load_config(&path).expect("load");
        assert_eq!(config.dem.as_deref(), Some("basin"));
        assert!(!config.move_outlet);
        assert_eq!(config.threshold, None);
    }

    #[test]
    fn explicit_path_is_the_only_candidate() {
        let explicit = Path::new("/etc/run.json");
        assert_eq!(
            config_candidates(Some(explicit), Path::new("/p")),
            vec![PathBuf::from("/etc/run.json")]
        );
        assert_eq!(
            config_candidates(None, Path::new("/p"))[0],
            PathBuf::from("/p/taudem.json")
        );
    }
}
