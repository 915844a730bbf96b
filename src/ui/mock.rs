//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion. Clones share the same recording, so a
//! test can hand one clone to the engine and inspect another afterwards.
//!
//! # Example
//!
//! ```
//! use stagehand::ui::{MockUI, Prompt, PromptType, UserInterface};
//!
//! let ui = MockUI::new();
//! ui.set_prompt_response("Branch?", "develop");
//!
//! let mut engine_side = ui.clone();
//! let answer = engine_side
//!     .prompt(&Prompt::new("Branch?", PromptType::Input))
//!     .unwrap();
//!
//! assert_eq!(answer.as_string(), "develop");
//! assert_eq!(ui.prompts_shown(), vec!["Branch?".to_string()]);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::tasks::Help;

use super::prompts::parse_yes;
use super::{Prompt, PromptResult, PromptType, StagehandTheme, UserInterface};

#[derive(Debug, Default)]
struct Recording {
    interactive: bool,
    lines: Vec<String>,
    messages: Vec<String>,
    tasks: Vec<(String, Option<String>)>,
    groups: Vec<String>,
    commands: Vec<(String, String)>,
    outputs: Vec<(String, String, bool)>,
    infos: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    helps: Vec<String>,
    prompt_responses: HashMap<String, String>,
    prompt_queues: HashMap<String, VecDeque<String>>,
    prompts_shown: Vec<String>,
}

/// Mock UI implementation for testing.
///
/// Every interaction is also appended, rendered without colors, to a single
/// transcript ([`lines`](Self::lines)) so tests can assert on ordering.
#[derive(Debug, Clone)]
pub struct MockUI {
    inner: Arc<Mutex<Recording>>,
    theme: Arc<StagehandTheme>,
}

impl Default for MockUI {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUI {
    /// Create a new MockUI.
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            theme: Arc::new(StagehandTheme::plain()),
        }
    }

    fn state(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set a response for a prompt key.
    pub fn set_prompt_response(&self, key: &str, response: &str) {
        self.state()
            .prompt_responses
            .insert(key.to_string(), response.to_string());
    }

    /// Queue multiple responses for the same prompt key.
    ///
    /// Responses are returned in order. After the queue is exhausted,
    /// falls back to `set_prompt_response` or the prompt default.
    pub fn queue_prompt_responses(&self, key: &str, responses: Vec<&str>) {
        let queue = responses.into_iter().map(|s| s.to_string()).collect();
        self.state().prompt_queues.insert(key.to_string(), queue);
    }

    /// Set whether this mock behaves as interactive.
    pub fn set_interactive(&self, interactive: bool) {
        self.state().interactive = interactive;
    }

    /// Full transcript, one entry per printed line.
    pub fn lines(&self) -> Vec<String> {
        self.state().lines.clone()
    }

    /// Plain messages.
    pub fn messages(&self) -> Vec<String> {
        self.state().messages.clone()
    }

    /// Task banners as (task, target).
    pub fn tasks(&self) -> Vec<(String, Option<String>)> {
        self.state().tasks.clone()
    }

    /// Task names in the order their bodies started (once per target).
    pub fn task_names(&self) -> Vec<String> {
        self.state().tasks.iter().map(|(t, _)| t.clone()).collect()
    }

    /// Group banners.
    pub fn groups(&self) -> Vec<String> {
        self.state().groups.clone()
    }

    /// Echoed commands as (origin, command).
    pub fn commands(&self) -> Vec<(String, String)> {
        self.state().commands.clone()
    }

    /// Command outputs as (origin, text, failed).
    pub fn outputs(&self) -> Vec<(String, String, bool)> {
        self.state().outputs.clone()
    }

    /// Informational messages.
    pub fn infos(&self) -> Vec<String> {
        self.state().infos.clone()
    }

    /// Warning messages.
    pub fn warnings(&self) -> Vec<String> {
        self.state().warnings.clone()
    }

    /// Error messages.
    pub fn errors(&self) -> Vec<String> {
        self.state().errors.clone()
    }

    /// Rendered help screens.
    pub fn helps(&self) -> Vec<String> {
        self.state().helps.clone()
    }

    /// Prompt keys in the order they were asked.
    pub fn prompts_shown(&self) -> Vec<String> {
        self.state().prompts_shown.clone()
    }

    /// Check if any transcript line contains `text`.
    pub fn has_line(&self, text: &str) -> bool {
        self.state().lines.iter().any(|l| l.contains(text))
    }

    /// Check if a specific info message was shown.
    pub fn has_info(&self, text: &str) -> bool {
        self.state().infos.iter().any(|m| m.contains(text))
    }

    /// Check if a specific warning was shown.
    pub fn has_warning(&self, text: &str) -> bool {
        self.state().warnings.iter().any(|m| m.contains(text))
    }

    /// Check if a specific error was shown.
    pub fn has_error(&self, text: &str) -> bool {
        self.state().errors.iter().any(|m| m.contains(text))
    }

    /// Clear all captured interactions (canned responses are kept).
    pub fn clear(&self) {
        let mut state = self.state();
        state.lines.clear();
        state.messages.clear();
        state.tasks.clear();
        state.groups.clear();
        state.commands.clear();
        state.outputs.clear();
        state.infos.clear();
        state.warnings.clear();
        state.errors.clear();
        state.helps.clear();
        state.prompts_shown.clear();
    }
}

fn answer(prompt: &Prompt, response: &str) -> PromptResult {
    match prompt.prompt_type {
        PromptType::Confirm => PromptResult::Bool(parse_yes(response)),
        PromptType::MultiSelect { .. } => PromptResult::Strings(
            response
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        PromptType::Input => PromptResult::String(response.to_string()),
    }
}

impl UserInterface for MockUI {
    fn message(&mut self, msg: &str) {
        let mut state = self.state();
        state.messages.push(msg.to_string());
        state.lines.push(msg.to_string());
    }

    fn task(&mut self, name: &str, target: Option<&str>) {
        let line = self.theme.format_task(name, target);
        let mut state = self.state();
        state
            .tasks
            .push((name.to_string(), target.map(str::to_string)));
        state.lines.push(line);
    }

    fn group(&mut self, name: &str) {
        let line = self.theme.format_group(name);
        let mut state = self.state();
        state.groups.push(name.to_string());
        state.lines.push(line);
    }

    fn command(&mut self, origin: &str, command: &str) {
        let line = self.theme.format_command(origin, command);
        let mut state = self.state();
        state
            .commands
            .push((origin.to_string(), command.to_string()));
        state.lines.push(line);
    }

    fn output(&mut self, origin: &str, text: &str, failed: bool) {
        let mut state = self.state();
        state
            .outputs
            .push((origin.to_string(), text.to_string(), failed));
        if !text.is_empty() {
            state.lines.push(text.to_string());
        }
    }

    fn info(&mut self, msg: &str) {
        let line = self.theme.format_info(msg);
        let mut state = self.state();
        state.infos.push(msg.to_string());
        state.lines.push(line);
    }

    fn warning(&mut self, msg: &str) {
        let line = self.theme.format_warning(msg);
        let mut state = self.state();
        state.warnings.push(msg.to_string());
        state.lines.push(line);
    }

    fn error(&mut self, msg: &str) {
        let line = self.theme.format_error(msg);
        let mut state = self.state();
        state.errors.push(msg.to_string());
        state.lines.push(line);
    }

    fn help(&mut self, help: &Help) {
        let text = help.render(&self.theme);
        let mut state = self.state();
        state.lines.extend(text.lines().map(str::to_string));
        state.helps.push(text);
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        let mut state = self.state();
        state.prompts_shown.push(prompt.key.clone());
        state.lines.push(prompt.question.clone());

        if let Some(response) = state
            .prompt_queues
            .get_mut(&prompt.key)
            .and_then(VecDeque::pop_front)
        {
            return Ok(answer(prompt, &response));
        }

        if let Some(response) = state.prompt_responses.get(&prompt.key) {
            return Ok(answer(prompt, response));
        }

        if let Some(default) = &prompt.default {
            return Ok(answer(prompt, default));
        }

        Ok(answer(prompt, ""))
    }

    fn is_interactive(&self) -> bool {
        self.state().interactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_recording() {
        let ui = MockUI::new();
        let mut other = ui.clone();
        other.message("hello");
        assert_eq!(ui.messages(), vec!["hello".to_string()]);
    }

    #[test]
    fn transcript_keeps_order() {
        let mut ui = MockUI::new();
        ui.task("deploy", Some("web1"));
        ui.command("web1", "uptime");
        ui.output("web1", "up 3 days", false);
        assert_eq!(
            ui.lines(),
            vec![
                "➤ Executing task deploy on target [web1]".to_string(),
                "[web1] > `uptime`".to_string(),
                "up 3 days".to_string(),
            ]
        );
    }

    #[test]
    fn task_names_lists_banners() {
        let mut ui = MockUI::new();
        ui.task("a", None);
        ui.task("b", Some("t"));
        assert_eq!(ui.task_names(), vec!["a", "b"]);
    }

    #[test]
    fn confirm_uses_configured_response() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("Sure?", "yes");
        let result = ui
            .prompt(&Prompt::new("Sure?", PromptType::Confirm))
            .unwrap();
        assert_eq!(result, PromptResult::Bool(true));
    }

    #[test]
    fn queued_responses_come_first() {
        let mut ui = MockUI::new();
        ui.queue_prompt_responses("Name?", vec!["one", "two"]);
        ui.set_prompt_response("Name?", "fallback");
        let prompt = Prompt::new("Name?", PromptType::Input);

        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "one");
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "two");
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "fallback");
    }

    #[test]
    fn falls_back_to_prompt_default() {
        let mut ui = MockUI::new();
        let prompt = Prompt::new("Branch?", PromptType::Input).with_default("main");
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "main");
    }

    #[test]
    fn multiselect_splits_on_commas() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("Pick", "a, c");
        let prompt = Prompt::new(
            "Pick",
            PromptType::MultiSelect {
                choices: vec!["a".into(), "b".into(), "c".into()],
            },
        );
        assert_eq!(
            ui.prompt(&prompt).unwrap(),
            PromptResult::Strings(vec!["a".into(), "c".into()])
        );
    }

    #[test]
    fn unconfigured_prompts_return_empty_answers() {
        let mut ui = MockUI::new();
        assert_eq!(
            ui.prompt(&Prompt::new("Sure?", PromptType::Confirm)).unwrap(),
            PromptResult::Bool(false)
        );
        assert_eq!(
            ui.prompt(&Prompt::new("Name?", PromptType::Input)).unwrap(),
            PromptResult::String(String::new())
        );
    }

    #[test]
    fn clear_keeps_responses() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("Q", "A");
        ui.info("noise");
        ui.clear();
        assert!(ui.infos().is_empty());
        assert_eq!(
            ui.prompt(&Prompt::new("Q", PromptType::Input))
                .unwrap()
                .as_string(),
            "A"
        );
    }
}
