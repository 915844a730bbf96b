//! Turning a parsed stagefile into declarations.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{self, ConfigValue};
use crate::error::{Result, StagehandError};
use crate::runner::{Session, Stagehand};
use crate::shell::execute;
use crate::targets::Selector;
use crate::tasks::{Argument, Inputs, TaskOption};

use super::schema::{
    ArgumentConfig, ConfigSource, OptionConfig, Stagefile, Step, StepAction, TaskConfig,
};

/// Declare everything in `file` on `stagehand`.
///
/// # Errors
///
/// `StagefileInvalid` for unusable declarations, `InvalidHost` for a bad
/// target host.
pub fn apply(file: Stagefile, stagehand: &mut Stagehand) -> Result<()> {
    validate(&file)?;

    for (name, source) in file.config {
        match source {
            ConfigSource::Literal(value) => {
                stagehand.set(name, value);
            }
            ConfigSource::Command { local } => {
                stagehand.set_lazy(name.clone(), move || command_value(&name, &local));
            }
        }
    }

    for target in file.targets {
        let mut builder = stagehand.target(&target.name, &target.host)?;
        for role in target.roles {
            builder = builder.add_role(role);
        }
        for key in target.keys {
            builder = builder.key(key);
        }
        for (name, source) in target.config {
            builder = match source {
                ConfigSource::Literal(value) => builder.set(name, value),
                ConfigSource::Command { local } => {
                    builder.set_lazy(name.clone(), move || command_value(&name, &local))
                }
            };
        }
    }

    for argument in file.arguments {
        stagehand.add_argument(argument_from(argument));
    }
    for option in file.options {
        stagehand.add_option(option_from(option));
    }
    if !file.on.is_empty() {
        stagehand.default_selector(template_selector(file.on));
    }

    for (name, task) in file.tasks {
        declare_task(stagehand, name, task);
    }

    for (name, group) in file.groups {
        let mut builder = stagehand
            .group(name, group.tasks)
            .short_description(group.description);
        if group.once {
            builder = builder.once();
        }
        if group.private {
            builder.private();
        }
    }

    Ok(())
}

fn validate(file: &Stagefile) -> Result<()> {
    let mut seen = HashSet::new();
    for target in &file.targets {
        if target.name.trim().is_empty() {
            return Err(invalid("a target has an empty name"));
        }
        if !seen.insert(target.name.as_str()) {
            return Err(invalid(format!("target '{}' is declared twice", target.name)));
        }
    }
    for name in file.tasks.keys().chain(file.groups.keys()) {
        if name.trim().is_empty() || name.contains(char::is_whitespace) {
            return Err(invalid(format!("'{}' is not a valid task name", name)));
        }
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> StagehandError {
    StagehandError::StagefileInvalid {
        message: message.into(),
    }
}

fn declare_task(stagehand: &mut Stagehand, name: String, task: TaskConfig) {
    if !task.before.is_empty() {
        stagehand.before(&name, task.before);
    }
    if !task.after.is_empty() {
        stagehand.after(&name, task.after);
    }

    let steps = task.steps;
    let mut builder = stagehand
        .task(name, move |s: &mut Session<'_>| run_steps(s, &steps))
        .short_description(task.description)
        .description(task.help);

    for argument in task.arguments {
        builder = builder.add_argument(argument_from(argument));
    }
    for option in task.options {
        builder = builder.add_option(option_from(option));
    }
    for name in task.remove_arguments {
        builder = builder.remove_argument(name);
    }
    for name in task.remove_options {
        builder = builder.remove_option(name);
    }
    if !task.only_on.is_empty() {
        builder = builder.only_on_targets(task.only_on);
    }
    if !task.on.is_empty() {
        builder = builder.selector(template_selector(task.on));
    }
    if task.once {
        builder = builder.once();
    }
    if task.private {
        builder.private();
    }
}

fn argument_from(config: ArgumentConfig) -> Argument {
    let mut argument = Argument::new(config.name, config.description).kind(config.kind.into());
    if let Some(default) = config.default {
        argument = argument.default(ConfigValue::from(default));
    }
    if config.multiple {
        argument = argument.multiple();
    }
    argument
}

fn option_from(config: OptionConfig) -> TaskOption {
    let mut option = TaskOption::new(config.name, config.description).kind(config.kind.into());
    if let Some(default) = config.default {
        option = option.default(ConfigValue::from(default));
    }
    option
}

/// A selector rendering each entry against the parsed inputs.
///
/// Entries that render empty are dropped.
fn template_selector(entries: Vec<String>) -> Selector {
    Arc::new(move |inputs: &Inputs| {
        entries
            .iter()
            .filter_map(|entry| match config::parse(entry, inputs) {
                Ok(rendered) => Some(rendered.trim().to_string()),
                Err(e) => {
                    tracing::warn!("target entry '{}': {}", entry, e);
                    None
                }
            })
            .filter(|rendered| !rendered.is_empty())
            .collect()
    })
}

/// Trimmed stdout of `command`; empty when it cannot run.
fn command_value(name: &str, command: &str) -> String {
    match execute(command) {
        Ok(result) => {
            if !result.success {
                tracing::warn!("config '{}': `{}` exited unsuccessfully", name, command);
            }
            result.stdout.trim().to_string()
        }
        Err(e) => {
            tracing::warn!("config '{}': {}", name, e);
            String::new()
        }
    }
}

fn run_steps(session: &mut Session<'_>, steps: &[Step]) -> Result<()> {
    for step in steps {
        let output = match &step.action {
            StepAction::Print(text) => {
                session.println(text)?;
                None
            }
            StepAction::Local(command) => Some((command.as_str(), session.local(command)?)),
            StepAction::Remote(command) => Some((command.as_str(), session.remote(command)?)),
            StepAction::Cd(path) => {
                session.cd(path)?;
                None
            }
            StepAction::Export { name, value } => {
                session.export(name, value)?;
                None
            }
            StepAction::Upload { from, to } => Some((from.as_str(), session.upload(from, to)?)),
            StepAction::Download { from, to } => {
                Some((from.as_str(), session.download(from, to)?))
            }
        };

        if let Some((what, output)) = output {
            if let Some(error) = &output.error {
                if step.ignore_errors {
                    tracing::debug!("ignoring failure of `{}`: {}", what, error);
                } else {
                    return Err(session.fail(format!("`{}` failed: {}", what, error)));
                }
            }
        }
    }
    Ok(())
}
