// src/config/mod.rs

//! Plan file loading and validation.
//!
//! - [`model`]: the TOML-backed data model.
//! - [`loader`]: reading a plan from disk.
//! - [`validate`]: dependency and config checks (`RawPlanFile` -> `PlanFile`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_plan};
pub use model::{ExecutorSection, PlanFile, PriorityValue, RawPlanFile, TaskConfig};
