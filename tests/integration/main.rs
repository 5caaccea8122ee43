mod error_handling;
mod plan_model;
mod plan_run;
mod logging_level;
