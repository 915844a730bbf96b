//! Stagehand - declarative deployment and task orchestration.
//!
//! Declare configuration, target machines grouped by roles, and named tasks;
//! Stagehand decides which tasks run on which targets, in what order, and
//! with which configuration values visible.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface
//! - [`config`] - Lazy config store and `{{ name }}` templates
//! - [`error`] - Error types and result aliases
//! - [`remote`] - Remote execution gateway and connection pool
//! - [`runner`] - Declarations, the dispatch engine and task sessions
//! - [`shell`] - Local command execution
//! - [`stagefile`] - Declarative YAML stagefiles
//! - [`targets`] - Target registry and selection
//! - [`tasks`] - Task model, parameter parsing, assembly and help
//! - [`ui`] - Terminal output and prompts
//!
//! # Example
//!
//! ```
//! use stagehand::remote::MockTransport;
//! use stagehand::runner::Stagehand;
//! use stagehand::ui::MockUI;
//!
//! let ui = MockUI::new();
//! let transport = MockTransport::new();
//! let mut stagehand = Stagehand::new()
//!     .with_ui(ui.clone())
//!     .with_transport(transport.clone());
//!
//! stagehand.set("env", "prod1");
//! stagehand
//!     .target("p1", "deploy@10.0.0.1")
//!     .unwrap()
//!     .add_role("prod")
//!     .set("env", "special");
//! stagehand.target("p2", "deploy@10.0.0.2").unwrap().add_role("prod");
//! stagehand.on_targets(|_| vec!["prod".to_string()]);
//! stagehand.task("deploy", |s| s.remote("echo {{env}}").map(|_| ()));
//!
//! stagehand.run(["deploy"]).unwrap();
//!
//! assert_eq!(transport.commands_for("p1"), vec!["echo special"]);
//! assert_eq!(transport.commands_for("p2"), vec!["echo prod1"]);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod remote;
pub mod runner;
pub mod shell;
pub mod stagefile;
pub mod targets;
pub mod tasks;
pub mod ui;

pub use error::{Result, StagehandError};
pub use runner::{CommandOutput, Engine, Session, Stagehand};
