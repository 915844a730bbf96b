//! The task model.
//!
//! - [`Task`], [`TaskBody`] and [`TaskBuilder`] describe units of work
//! - [`Argument`], [`TaskOption`] and [`Inputs`] describe and hold parameters
//! - [`assemble`] freezes declarations into a [`TaskTable`] and
//!   [`DispatchTree`]
//! - [`parse_inputs`] reads a task's command-line words
//! - [`Help`] is what `--help` shows

pub mod args;
pub mod assembler;
pub mod help;
pub mod params;
pub mod task;

pub use args::{parse_bool, parse_inputs};
pub use assembler::{assemble, merge_parameters, Declarations, DispatchTree, Found, TaskTable};
pub use help::Help;
pub use params::{help_option, Argument, Inputs, Kind, TaskOption};
pub use task::{Task, TaskBody, TaskBuilder, TaskFn, TaskId};
