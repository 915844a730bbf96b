//! Running local processes.

pub mod command;

pub use command::{execute, execute_program, CommandResult};
