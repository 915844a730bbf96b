//! Schema of `stagehand.yml`.
//!
//! ```yaml
//! config:
//!   app: shop
//!   revision: { local: git rev-parse --short HEAD }
//!
//! targets:
//!   - name: p1
//!     host: deploy@10.0.0.1
//!     roles: [prod]
//!     config:
//!       env: special
//!
//! on: ["{{stage}}"]
//!
//! arguments:
//!   - name: stage
//!     description: Stage to act on
//!     default: prod
//!
//! tasks:
//!   deploy:
//!     description: Ship {{app}}
//!     steps:
//!       - remote: echo {{env}}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::ConfigValue;
use crate::tasks::Kind;

/// Root of a stagefile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stagefile {
    /// Global configuration.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, ConfigSource>,

    /// Targets, in registration order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetConfig>,

    /// Arguments every task inherits, in positional order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentConfig>,

    /// Options every task inherits.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionConfig>,

    /// Default target selection; entries are templates over the inputs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on: Vec<String>,

    /// Task definitions.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tasks: BTreeMap<String, TaskConfig>,

    /// Group definitions.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, GroupConfig>,
}

/// A config value or a command producing it on first read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigSource {
    /// Trimmed output of a local shell command.
    Command { local: String },
    /// A literal.
    Literal(Literal),
}

/// A literal scalar or string list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl From<Literal> for ConfigValue {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Bool(b) => ConfigValue::Bool(b),
            Literal::Int(i) => ConfigValue::Int(i),
            Literal::Str(s) => ConfigValue::Str(s),
            Literal::List(items) => ConfigValue::List(items),
        }
    }
}

/// A target machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target name.
    pub name: String,

    /// `[ssh://][user@]host[:port]`
    pub host: String,

    /// Roles the target carries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Private keys, tried in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<PathBuf>,

    /// Values shadowing the global config while this target is current.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, ConfigSource>,
}

/// Kind of an argument or option value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    String,
    Bool,
    Int,
}

impl From<ValueKind> for Kind {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::String => Kind::String,
            ValueKind::Bool => Kind::Bool,
            ValueKind::Int => Kind::Int,
        }
    }
}

/// A positional argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "type")]
    pub kind: ValueKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,

    /// Collect every remaining value.
    #[serde(default, skip_serializing_if = "is_false")]
    pub multiple: bool,
}

/// A flag or valued option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "type")]
    pub kind: ValueKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,
}

/// A task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// One-line summary.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Long description shown in help.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub help: String,

    #[serde(skip_serializing_if = "is_false")]
    pub once: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub private: bool,

    /// Restrict list.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub only_on: Vec<String>,

    /// Task selector; entries are templates over the inputs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub on: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentConfig>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionConfig>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_arguments: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_options: Vec<String>,

    /// What the task does, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

/// A group of tasks run in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Member task names.
    pub tasks: Vec<String>,

    #[serde(skip_serializing_if = "is_false")]
    pub once: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub private: bool,
}

/// One step of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: StepAction,

    /// Keep going when the command fails.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_errors: bool,
}

/// What a step does. Every string is a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Print a line.
    Print(String),
    /// Run a local shell command.
    Local(String),
    /// Run a command on the current target.
    Remote(String),
    /// Start later remote commands in a directory.
    Cd(String),
    /// Export a variable to later remote commands.
    Export { name: String, value: String },
    /// Copy to the current target.
    Upload { from: String, to: String },
    /// Copy from the current target.
    Download { from: String, to: String },
}

fn is_false(b: &bool) -> bool {
    !b
}
