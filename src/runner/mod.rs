//! Task orchestration.
//!
//! [`Stagehand`] collects declarations; [`Stagehand::finalize`] freezes them
//! into an [`Engine`] that dispatches command lines. Task bodies receive a
//! [`Session`] and get [`CommandOutput`] back from every command they run.

pub mod engine;
pub mod output;
pub mod session;
pub mod stagehand;

pub use engine::{Engine, ON_END, ON_START};
pub use output::CommandOutput;
pub use session::Session;
pub use stagehand::{Stagehand, DEFAULT_PROGRAM};
