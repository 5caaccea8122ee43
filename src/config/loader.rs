// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::Result;

/// Read and deserialize a plan file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_plan(&contents)
}

pub fn parse_plan(contents: &str) -> Result<RawPlanFile> {
    Ok(toml::from_str(contents)?)
}

/// Load a plan and validate it: tasks present, sane `[config]`, known
/// dependencies, no self-dependency, acyclic.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let raw = load_from_path(&path)?;
    let plan = PlanFile::try_from(raw)?;
    debug!(path = %path.as_ref().display(), tasks = plan.task.len(), "plan loaded");
    Ok(plan)
}

/// `Tierdag.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Tierdag.toml")
}
