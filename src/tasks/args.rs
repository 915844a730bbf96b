//! Parsing a task's flags and positional arguments.
//!
//! Options become clap flags (`-x` for single characters, `--name`
//! otherwise; `-name` is accepted as a spelling of `--name`). Positional
//! values are converted by hand so a default can stand in for a value that
//! does not parse.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::config::ConfigValue;
use crate::error::{Result, StagehandError};

use super::params::{Argument, Inputs, Kind, TaskOption};
use super::task::Task;

/// Parse `args` against `task`'s options and arguments.
///
/// # Errors
///
/// Returns `InvalidParameters` for unknown flags, bad option values, extra
/// positionals, and required arguments that are missing or do not parse.
pub fn parse_inputs(task: &Task, args: &[String]) -> Result<Inputs> {
    let invalid = |message: String| StagehandError::InvalidParameters {
        task: task.name().to_string(),
        message,
    };

    let arguments = task.ordered_arguments();
    let command = build_command(task, &arguments);
    let matches = command
        .try_get_matches_from(normalize(task, args))
        .map_err(|e| invalid(clap_message(&e)))?;

    let mut inputs = Inputs::new();

    for option in task.options().values() {
        inputs.set(option.name(), option_value(option, &matches));
    }

    if inputs.flag("help") {
        return Ok(inputs);
    }

    for argument in arguments {
        let value = if argument.is_multiple() {
            let raw: Vec<String> = matches
                .get_many::<String>(argument.name())
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            multiple_value(argument, raw)
        } else {
            let raw = matches.get_one::<String>(argument.name()).cloned();
            single_value(argument, raw.as_deref().unwrap_or(""))
        };
        let value = value.ok_or_else(|| {
            invalid(format!("missing or invalid value for {}", argument.explain()))
        })?;
        inputs.set(argument.name(), value);
    }

    Ok(inputs)
}

fn build_command(task: &Task, arguments: &[&Argument]) -> Command {
    let mut command = Command::new(task.name().to_string())
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true);

    for option in task.options().values() {
        let mut arg = Arg::new(option.name().to_string()).required(false);
        arg = match option.name().chars().next() {
            Some(short) if option.is_short() => arg.short(short),
            _ => arg.long(option.name().to_string()),
        };
        arg = match option.value_kind() {
            Kind::Bool => arg
                .action(ArgAction::Set)
                .value_parser(bool_value)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true"),
            Kind::Int => arg
                .action(ArgAction::Set)
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true),
            Kind::String => arg.action(ArgAction::Set),
        };
        command = command.arg(arg);
    }

    let last = arguments.len().saturating_sub(1);
    for (index, argument) in arguments.iter().enumerate() {
        let mut arg = Arg::new(argument.name().to_string())
            .index(index + 1)
            .required(false)
            .allow_negative_numbers(true);
        arg = if argument.is_multiple() && index == last {
            arg.action(ArgAction::Append).num_args(1..)
        } else {
            if argument.is_multiple() {
                tracing::warn!(
                    "argument '{}' of '{}' is not last and takes a single value",
                    argument.name(),
                    task.name()
                );
            }
            arg.action(ArgAction::Set)
        };
        command = command.arg(arg);
    }

    command
}

/// Rewrite `-name` into `--name` for known multi-character options.
fn normalize(task: &Task, args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut positional_only = false;

    for arg in args {
        if positional_only {
            out.push(arg.clone());
            continue;
        }
        if arg == "--" {
            positional_only = true;
            out.push(arg.clone());
            continue;
        }
        let rewritten = arg
            .strip_prefix('-')
            .filter(|rest| !rest.starts_with('-'))
            .and_then(|rest| {
                let name = rest.split('=').next().unwrap_or(rest);
                task.options()
                    .get(name)
                    .filter(|o| !o.is_short())
                    .map(|_| format!("--{}", rest))
            });
        out.push(rewritten.unwrap_or_else(|| arg.clone()));
    }

    out
}

fn option_value(option: &TaskOption, matches: &ArgMatches) -> ConfigValue {
    let id = option.name();
    match option.value_kind() {
        Kind::Bool => matches
            .get_one::<bool>(id)
            .map(|b| ConfigValue::Bool(*b))
            .unwrap_or_else(|| option.fallback()),
        Kind::Int => matches
            .get_one::<i64>(id)
            .map(|i| ConfigValue::Int(*i))
            .unwrap_or_else(|| option.fallback()),
        Kind::String => matches
            .get_one::<String>(id)
            .map(|s| ConfigValue::Str(s.clone()))
            .unwrap_or_else(|| option.fallback()),
    }
}

/// Convert one raw positional.
///
/// An empty or unparsable value falls back to the default; with no default
/// it is an error (`None`).
fn single_value(argument: &Argument, raw: &str) -> Option<ConfigValue> {
    let parsed = match argument.value_kind() {
        Kind::String => (!raw.is_empty()).then(|| ConfigValue::Str(raw.to_string())),
        Kind::Bool => parse_bool(raw).map(ConfigValue::Bool),
        Kind::Int => raw.parse::<i64>().ok().map(ConfigValue::Int),
    };
    parsed.or_else(|| argument.default_value().cloned())
}

fn multiple_value(argument: &Argument, raw: Vec<String>) -> Option<ConfigValue> {
    if raw.is_empty() {
        return argument.default_value().map(|d| match d {
            ConfigValue::List(_) => d.clone(),
            other => ConfigValue::List(vec![other.as_string()]),
        });
    }
    let valid = raw.iter().all(|value| match argument.value_kind() {
        Kind::String => true,
        Kind::Bool => parse_bool(value).is_some(),
        Kind::Int => value.parse::<i64>().is_ok(),
    });
    valid.then_some(ConfigValue::List(raw))
}

/// Booleans as written on command lines: `1 t T TRUE true True` and their
/// negative counterparts.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn bool_value(raw: &str) -> std::result::Result<bool, String> {
    parse_bool(raw).ok_or_else(|| format!("invalid boolean `{}`", raw))
}

fn clap_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.trim_start_matches("error: ").trim().to_string()
}
