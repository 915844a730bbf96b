//! Interactive prompts.

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect};

use crate::error::{Result, StagehandError};

use super::{Prompt, PromptResult, PromptType};

/// Convert dialoguer errors to StagehandError.
fn map_dialoguer_err(e: dialoguer::Error) -> StagehandError {
    StagehandError::Io(e.into())
}

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

/// Prompt the user for input.
pub fn prompt_user(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    match &prompt.prompt_type {
        PromptType::Confirm => prompt_confirm(prompt, term),
        PromptType::Input => prompt_input(prompt, term),
        PromptType::MultiSelect { choices } => prompt_multiselect(prompt, choices, term),
    }
}

/// Interpret a textual yes/no default.
pub(crate) fn parse_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "true" | "y" | "yes" | "1"
    )
}

fn prompt_confirm(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    let default = prompt.default.as_deref().map(parse_yes).unwrap_or(false);

    let theme = prompt_theme();
    let result = Confirm::with_theme(&theme)
        .with_prompt(&prompt.question)
        .default(default)
        .interact_on(term)
        .map_err(map_dialoguer_err)?;

    Ok(PromptResult::Bool(result))
}

fn prompt_input(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    let theme = prompt_theme();
    let input = Input::<String>::with_theme(&theme)
        .with_prompt(&prompt.question)
        .allow_empty(true);

    let result: String = match &prompt.default {
        Some(default) => input
            .default(default.clone())
            .interact_on(term)
            .map_err(map_dialoguer_err)?,
        None => input.interact_on(term).map_err(map_dialoguer_err)?,
    };

    Ok(PromptResult::String(result.trim().to_string()))
}

fn prompt_multiselect(prompt: &Prompt, choices: &[String], term: &Term) -> Result<PromptResult> {
    let defaults = default_flags(prompt.default.as_deref(), choices);

    let theme = prompt_theme();
    let selections = MultiSelect::with_theme(&theme)
        .with_prompt(&prompt.question)
        .items(choices)
        .defaults(&defaults)
        .interact_on(term)
        .map_err(map_dialoguer_err)?;

    let values = selections.iter().map(|&i| choices[i].clone()).collect();

    Ok(PromptResult::Strings(values))
}

/// Pre-checked flags for each choice from a comma separated default list.
fn default_flags(default: Option<&str>, choices: &[String]) -> Vec<bool> {
    let wanted: Vec<&str> = default
        .map(|d| d.split(',').map(str::trim).collect())
        .unwrap_or_default();
    choices
        .iter()
        .map(|choice| wanted.contains(&choice.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_yes_accepts_common_spellings() {
        assert!(parse_yes("y"));
        assert!(parse_yes("Yes"));
        assert!(parse_yes(" true "));
        assert!(!parse_yes("n"));
        assert!(!parse_yes(""));
    }

    #[test]
    fn default_flags_mark_listed_choices() {
        let choices = vec!["agent".to_string(), "tty".to_string(), "ssh".to_string()];
        assert_eq!(
            default_flags(Some("agent, ssh"), &choices),
            vec![true, false, true]
        );
        assert_eq!(default_flags(None, &choices), vec![false, false, false]);
    }
}
