//! Interactive terminal UI.

use console::Term;
use std::io::Write;

use crate::error::Result;
use crate::tasks::Help;

use super::{prompt_user, Prompt, PromptResult, StagehandTheme, UserInterface};

/// Interactive terminal UI implementation.
pub struct TerminalUI {
    term: Term,
    theme: StagehandTheme,
}

impl TerminalUI {
    /// Create a new terminal UI, colored or plain.
    pub fn new(colors: bool) -> Self {
        let theme = if colors {
            StagehandTheme::new()
        } else {
            StagehandTheme::plain()
        };

        Self {
            term: Term::stdout(),
            theme,
        }
    }
}

impl UserInterface for TerminalUI {
    fn message(&mut self, msg: &str) {
        writeln!(self.term, "{}", msg).ok();
    }

    fn task(&mut self, name: &str, target: Option<&str>) {
        writeln!(self.term, "{}", self.theme.format_task(name, target)).ok();
    }

    fn group(&mut self, name: &str) {
        writeln!(self.term, "{}", self.theme.format_group(name)).ok();
    }

    fn command(&mut self, origin: &str, command: &str) {
        writeln!(self.term, "{}", self.theme.format_command(origin, command)).ok();
    }

    fn output(&mut self, origin: &str, text: &str, failed: bool) {
        if text.is_empty() && !failed {
            return;
        }
        writeln!(
            self.term,
            "{}",
            self.theme.format_output_marker(origin, failed)
        )
        .ok();
        if !text.is_empty() {
            writeln!(self.term, "{}", text).ok();
        }
    }

    fn info(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.format_info(msg)).ok();
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.format_warning(msg)).ok();
    }

    fn error(&mut self, msg: &str) {
        let stderr = Term::stderr();
        writeln!(&stderr, "{}", self.theme.format_error(msg)).ok();
    }

    fn help(&mut self, help: &Help) {
        write!(self.term, "{}", help.render(&self.theme)).ok();
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        prompt_user(prompt, &self.term)
    }

    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }
}
