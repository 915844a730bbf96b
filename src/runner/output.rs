//! What a local or remote command left behind.

use crate::config::ConfigValue;
use crate::remote::RemoteOutput;
use crate::shell::CommandResult;

/// Trimmed output of a command plus its failure, if any.
///
/// A failed command is not an error of the task: the body inspects
/// [`has_error`](Self::has_error) and decides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Trimmed standard output.
    pub text: String,
    /// Trimmed standard error.
    pub stderr: String,
    /// Why the command failed.
    pub error: Option<String>,
}

impl CommandOutput {
    /// A failure with no output, e.g. an unreachable target.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Whether the command failed.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Output text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Output as an integer; 0 when it is not one.
    pub fn int(&self) -> i64 {
        self.text.parse().unwrap_or(0)
    }

    /// Whether the output is exactly `true`.
    pub fn bool(&self) -> bool {
        self.text == "true"
    }

    /// Output split on `separator`, each piece trimmed.
    pub fn split(&self, separator: &str) -> Vec<String> {
        if self.text.is_empty() {
            return Vec::new();
        }
        self.text
            .split(separator)
            .map(|part| part.trim().to_string())
            .collect()
    }

    /// Text shown under the command: stdout, or stderr when that is all
    /// there is.
    pub(crate) fn display(&self) -> &str {
        if self.text.is_empty() {
            &self.stderr
        } else {
            &self.text
        }
    }
}

impl From<RemoteOutput> for CommandOutput {
    fn from(output: RemoteOutput) -> Self {
        Self {
            text: output.stdout.trim().to_string(),
            stderr: output.stderr.trim().to_string(),
            error: output.exit_error,
        }
    }
}

impl From<CommandResult> for CommandOutput {
    fn from(result: CommandResult) -> Self {
        Self {
            error: result.exit_error(),
            text: result.stdout.trim().to_string(),
            stderr: result.stderr.trim().to_string(),
        }
    }
}

impl From<CommandOutput> for ConfigValue {
    fn from(output: CommandOutput) -> Self {
        ConfigValue::Str(output.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(text: &str) -> CommandOutput {
        CommandOutput {
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn int_falls_back_to_zero() {
        assert_eq!(output("42").int(), 42);
        assert_eq!(output("forty").int(), 0);
    }

    #[test]
    fn bool_is_literal_true() {
        assert!(output("true").bool());
        assert!(!output("yes").bool());
        assert!(!output("").bool());
    }

    #[test]
    fn split_trims_pieces() {
        assert_eq!(output("a, b ,c").split(","), vec!["a", "b", "c"]);
        assert!(output("").split(",").is_empty());
    }

    #[test]
    fn remote_output_is_trimmed() {
        let out: CommandOutput = RemoteOutput::ok("  prod1\n").into();
        assert_eq!(out.text(), "prod1");
        assert!(!out.has_error());
    }

    #[test]
    fn failure_keeps_reason() {
        let out = CommandOutput::failure("unreachable");
        assert!(out.has_error());
        assert_eq!(out.text(), "");
    }

    #[test]
    fn display_prefers_stdout() {
        let out = CommandOutput {
            text: String::new(),
            stderr: "boom".to_string(),
            error: Some("exit status 1".to_string()),
        };
        assert_eq!(out.display(), "boom");
        assert_eq!(output("ok").display(), "ok");
    }

    #[test]
    fn converts_into_config_value() {
        let value: ConfigValue = output("abc123").into();
        assert_eq!(value.as_string(), "abc123");
    }
}
