//! User-facing output and prompts.
//!
//! Everything the engine prints goes through [`UserInterface`]:
//! task banners, echoed commands and their output, help screens,
//! denied selections and prompts.
//!
//! - [`TerminalUI`] writes to the terminal with [`StagehandTheme`] colors
//! - [`MockUI`] records everything for tests
//!
//! # Example
//!
//! ```
//! use stagehand::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.command("local", "whoami");
//! ui.output("local", "deploy", false);
//!
//! assert_eq!(ui.commands(), vec![("local".to_string(), "whoami".to_string())]);
//! assert!(ui.has_line("deploy"));
//! ```

pub mod mock;
pub mod prompts;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use prompts::prompt_user;
pub use terminal::TerminalUI;
pub use theme::{should_use_colors, StagehandTheme};

use crate::error::Result;
use crate::tasks::Help;

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Display a plain line of text.
    fn message(&mut self, msg: &str);

    /// Announce a task body about to run, optionally on a target.
    fn task(&mut self, name: &str, target: Option<&str>);

    /// Announce a task group about to run its members.
    fn group(&mut self, name: &str);

    /// Echo a command before running it. `origin` is a target name or `local`.
    fn command(&mut self, origin: &str, command: &str);

    /// Show the output of a finished command.
    fn output(&mut self, origin: &str, text: &str, failed: bool);

    /// Display an informational message.
    fn info(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message.
    fn error(&mut self, msg: &str);

    /// Render a task's help screen.
    fn help(&mut self, help: &Help);

    /// Show a prompt and get user input.
    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult>;

    /// Check if running in interactive mode.
    fn is_interactive(&self) -> bool;
}

/// A prompt to show to the user.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Key used by [`MockUI`] to look up canned answers.
    pub key: String,
    /// The question to display.
    pub question: String,
    /// The type of prompt.
    pub prompt_type: PromptType,
    /// Default value if user just presses enter.
    ///
    /// For multi-select prompts this is a comma separated list.
    pub default: Option<String>,
}

impl Prompt {
    /// Create a prompt whose key is the question itself.
    pub fn new(question: impl Into<String>, prompt_type: PromptType) -> Self {
        let question = question.into();
        Self {
            key: question.clone(),
            question,
            prompt_type,
            default: None,
        }
    }

    /// Set the default answer.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// The type of prompt.
#[derive(Debug, Clone)]
pub enum PromptType {
    /// Yes/no confirmation.
    Confirm,
    /// Free-form text input.
    Input,
    /// Pick any number of entries from a list.
    MultiSelect { choices: Vec<String> },
}

/// Result of a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptResult {
    /// Boolean result from confirm.
    Bool(bool),
    /// String result from input.
    String(String),
    /// Picked entries from a multi-select.
    Strings(Vec<String>),
}

impl PromptResult {
    /// Get as string, suitable for interpolation.
    pub fn as_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::String(s) => s.clone(),
            Self::Strings(v) => v.join(","),
        }
    }

    /// Get as bool if this is a Bool result.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the picked entries; a single string becomes a one-element list.
    pub fn into_strings(self) -> Vec<String> {
        match self {
            Self::Strings(v) => v,
            Self::String(s) if s.is_empty() => Vec::new(),
            Self::String(s) => vec![s],
            Self::Bool(b) => vec![b.to_string()],
        }
    }
}

/// Create the terminal UI.
pub fn create_ui(colors: bool) -> Box<dyn UserInterface> {
    Box::new(TerminalUI::new(colors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_result_as_string() {
        assert_eq!(PromptResult::Bool(true).as_string(), "true");
        assert_eq!(PromptResult::String("hi".into()).as_string(), "hi");
        assert_eq!(
            PromptResult::Strings(vec!["a".into(), "b".into()]).as_string(),
            "a,b"
        );
    }

    #[test]
    fn prompt_result_as_bool() {
        assert_eq!(PromptResult::Bool(false).as_bool(), Some(false));
        assert_eq!(PromptResult::String("true".into()).as_bool(), None);
    }

    #[test]
    fn prompt_result_into_strings() {
        assert!(PromptResult::String(String::new()).into_strings().is_empty());
        assert_eq!(
            PromptResult::String("tty".into()).into_strings(),
            vec!["tty".to_string()]
        );
    }

    #[test]
    fn prompt_key_defaults_to_question() {
        let prompt = Prompt::new("Branch?", PromptType::Input).with_default("main");
        assert_eq!(prompt.key, "Branch?");
        assert_eq!(prompt.default.as_deref(), Some("main"));
    }
}
