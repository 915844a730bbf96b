//! Help screens rendered from the task model.

use crate::ui::StagehandTheme;

use super::task::Task;

/// Width the left column is padded to.
const COLUMN: usize = 20;

/// Everything shown by `--help` for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Help {
    /// How the task was reached, e.g. `stagehand db migrate`.
    pub path: String,
    /// One-line summary.
    pub short_description: String,
    /// (`-x`/`--name`, description), sorted by name.
    pub options: Vec<(String, String)>,
    /// (`<name>`, description), in positional order.
    pub arguments: Vec<(String, String)>,
    /// (subcommand, short description), sorted by name.
    pub commands: Vec<(String, String)>,
    /// Long description.
    pub description: String,
}

impl Help {
    /// Collect help for `task` reached through `path`.
    pub fn new(path: impl Into<String>, task: &Task, commands: Vec<(String, String)>) -> Self {
        let mut commands = commands;
        commands.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            path: path.into(),
            short_description: task.short_description().to_string(),
            options: task
                .options()
                .values()
                .map(|o| (o.explain(), o.description().to_string()))
                .collect(),
            arguments: task
                .ordered_arguments()
                .into_iter()
                .map(|a| (a.explain(), a.description().to_string()))
                .collect(),
            commands,
            description: task.description().to_string(),
        }
    }

    /// The usage line, without styling.
    pub fn usage(&self) -> String {
        let mut usage = self.path.clone();
        if !self.commands.is_empty() {
            usage.push_str(" <subcommand>");
        }
        usage.push_str(" [<options>]");
        for (explain, _) in &self.arguments {
            usage.push(' ');
            usage.push_str(explain);
        }
        usage
    }

    /// Render with `theme`.
    pub fn render(&self, theme: &StagehandTheme) -> String {
        let mut out = format!(
            "{}\n    {}",
            theme.heading.apply_to("Usage:"),
            self.usage()
        );
        if self.short_description.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!(" - {}\n", self.short_description));
        }

        section(&mut out, theme, "Options:", &self.options);
        section(&mut out, theme, "Arguments:", &self.arguments);
        section(&mut out, theme, "Available commands:", &self.commands);

        let description = self.description.trim_matches('\n');
        if !description.is_empty() {
            out.push_str(&format!("\n{}\n", theme.heading.apply_to("Description:")));
            for line in description.lines() {
                out.push_str(&format!("    {}\n", line));
            }
        }

        out
    }
}

fn section(out: &mut String, theme: &StagehandTheme, title: &str, rows: &[(String, String)]) {
    if rows.is_empty() {
        return;
    }
    out.push_str(&format!("\n{}\n", theme.heading.apply_to(title)));
    for (name, text) in rows {
        let padded = format!("{:<width$}", name, width = COLUMN);
        out.push_str(&format!("    {} {}\n", theme.name.apply_to(padded), text).trim_end());
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::params::{help_option, Argument, TaskOption};
    use crate::tasks::task::{TaskBody, TaskBuilder};

    fn deploy() -> Task {
        let mut task = Task::new("deploy", TaskBody::run(|_| Ok(())));
        let mut seq = 0;
        TaskBuilder::new(&mut task, &mut seq)
            .short_description("Deploy the app")
            .description("\nShips the current release.\nThen restarts.\n")
            .add_option(TaskOption::flag("v", "Verbose"))
            .add_option(help_option())
            .add_argument(Argument::new("stage", "Target stage"))
            .add_argument(Argument::new("paths", "Paths").multiple());
        task
    }

    #[test]
    fn usage_lists_arguments_in_order() {
        let help = Help::new("stagehand deploy", &deploy(), vec![]);
        assert_eq!(
            help.usage(),
            "stagehand deploy [<options>] <stage> <paths>..."
        );
    }

    #[test]
    fn usage_mentions_subcommands() {
        let task = Task::new("db", TaskBody::Namespace);
        let help = Help::new(
            "stagehand db",
            &task,
            vec![("migrate".into(), "Run migrations".into())],
        );
        assert_eq!(help.usage(), "stagehand db <subcommand> [<options>]");
    }

    #[test]
    fn render_plain() {
        let help = Help::new("stagehand deploy", &deploy(), vec![]);
        let text = help.render(&StagehandTheme::plain());
        let expected = "\
Usage:
    stagehand deploy [<options>] <stage> <paths>... - Deploy the app

Options:
    --help               Display help
    -v                   Verbose

Arguments:
    <stage>              Target stage
    <paths>...           Paths

Description:
    Ships the current release.
    Then restarts.
";
        assert_eq!(text, expected);
    }

    #[test]
    fn commands_are_sorted() {
        let task = Task::new("", TaskBody::Namespace);
        let help = Help::new(
            "stagehand",
            &task,
            vec![
                ("setup".into(), "Prepare".into()),
                ("deploy".into(), "Ship".into()),
            ],
        );
        let text = help.render(&StagehandTheme::plain());
        let deploy = text.find("deploy").unwrap();
        let setup = text.find("setup").unwrap();
        assert!(deploy < setup);
        assert!(text.contains("Available commands:"));
    }

    #[test]
    fn empty_description_rows_are_trimmed() {
        let task = Task::new("db", TaskBody::Namespace);
        let help = Help::new("stagehand db", &task, vec![("seed".into(), String::new())]);
        let text = help.render(&StagehandTheme::plain());
        assert!(text.contains("\n    seed\n"));
    }
}
