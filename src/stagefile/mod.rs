//! Declarative stagefiles.
//!
//! A `stagehand.yml` declares config, targets, parameters, tasks and groups
//! without writing Rust. [`apply`] turns one into [`Stagehand`]
//! declarations; task steps become task bodies.
//!
//! [`Stagehand`]: crate::runner::Stagehand

pub mod build;
pub mod loader;
pub mod schema;

pub use build::apply;
pub use loader::{discover, find_stagefile, load_stagefile, parse_stagefile, STAGEFILE_NAMES};
pub use schema::{
    ArgumentConfig, ConfigSource, GroupConfig, Literal, OptionConfig, Stagefile, Step,
    StepAction, TargetConfig, TaskConfig, ValueKind,
};
