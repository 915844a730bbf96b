//! Visual theme and styling.

use console::Style;

/// Stagehand's visual theme.
#[derive(Debug, Clone)]
pub struct StagehandTheme {
    /// Task names in banners (yellow).
    pub task: Style,
    /// Target names and the `local` origin (green).
    pub origin: Style,
    /// Commands echoed before they run.
    pub command: Style,
    /// Failed output markers (red).
    pub failure: Style,
    /// Informational lines such as denied selections (cyan).
    pub info: Style,
    /// Warnings (orange).
    pub warning: Style,
    /// Errors (red bold).
    pub error: Style,
    /// Help section headings (yellow).
    pub heading: Style,
    /// Option, argument and command names in help (green).
    pub name: Style,
    /// Secondary text.
    pub dim: Style,
}

impl Default for StagehandTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl StagehandTheme {
    /// Create the default colored theme.
    pub fn new() -> Self {
        Self {
            task: Style::new().yellow(),
            origin: Style::new().green(),
            command: Style::new().white(),
            failure: Style::new().red(),
            info: Style::new().cyan(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            heading: Style::new().yellow(),
            name: Style::new().green(),
            dim: Style::new().dim(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            task: Style::new(),
            origin: Style::new(),
            command: Style::new(),
            failure: Style::new(),
            info: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            heading: Style::new(),
            name: Style::new(),
            dim: Style::new(),
        }
    }

    /// `➤ Executing task deploy on target [web1]`
    pub fn format_task(&self, name: &str, target: Option<&str>) -> String {
        match target {
            Some(target) => format!(
                "➤ Executing task {} on target {}",
                self.task.apply_to(name),
                self.origin.apply_to(format!("[{}]", target))
            ),
            None => format!("➤ Executing task {}", self.task.apply_to(name)),
        }
    }

    /// `➤ Executing task group release`
    pub fn format_group(&self, name: &str) -> String {
        format!("➤ Executing task group {}", self.task.apply_to(name))
    }

    /// `[web1] > `git pull``
    pub fn format_command(&self, origin: &str, command: &str) -> String {
        format!(
            "{} {}",
            self.origin.apply_to(format!("[{}] >", origin)),
            self.command.apply_to(format!("`{}`", command))
        )
    }

    /// Marker line printed before a command's output.
    pub fn format_output_marker(&self, origin: &str, failed: bool) -> String {
        let marker = format!("[{}] <", origin);
        if failed {
            self.failure.apply_to(marker).to_string()
        } else {
            self.origin.apply_to(marker).to_string()
        }
    }

    /// An informational line, prefixed like a local command.
    pub fn format_info(&self, msg: &str) -> String {
        format!("{}", self.info.apply_to(format!("[local] > {}", msg)))
    }

    /// Format a warning message.
    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    /// Format an error message.
    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_banner_without_target() {
        let theme = StagehandTheme::plain();
        assert_eq!(theme.format_task("deploy", None), "➤ Executing task deploy");
    }

    #[test]
    fn task_banner_with_target() {
        let theme = StagehandTheme::plain();
        assert_eq!(
            theme.format_task("deploy", Some("web1")),
            "➤ Executing task deploy on target [web1]"
        );
    }

    #[test]
    fn group_banner() {
        let theme = StagehandTheme::plain();
        assert!(theme.format_group("release").contains("task group release"));
    }

    #[test]
    fn command_echo_quotes_command() {
        let theme = StagehandTheme::plain();
        assert_eq!(theme.format_command("local", "ls -la"), "[local] > `ls -la`");
    }

    #[test]
    fn output_marker_points_back() {
        let theme = StagehandTheme::plain();
        assert_eq!(theme.format_output_marker("web1", false), "[web1] <");
        assert_eq!(theme.format_output_marker("web1", true), "[web1] <");
    }

    #[test]
    fn info_is_prefixed_with_local() {
        let theme = StagehandTheme::plain();
        assert_eq!(theme.format_info("hello"), "[local] > hello");
    }

    #[test]
    fn warning_and_error_have_icons() {
        let theme = StagehandTheme::plain();
        assert!(theme.format_warning("careful").starts_with("⚠"));
        assert!(theme.format_error("broken").starts_with("✗"));
    }

    #[test]
    fn colored_theme_formats_without_panic() {
        let theme = StagehandTheme::default();
        let _ = theme.format_task("deploy", Some("web1"));
        let _ = theme.format_command("web1", "uptime");
    }
}
