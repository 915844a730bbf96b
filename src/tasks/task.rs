//! Tasks, task groups and their builders.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::runner::Session;
use crate::targets::Selector;

use super::params::{Argument, Inputs, TaskOption};

/// Index of a task in a finalized [`TaskTable`](super::TaskTable).
pub type TaskId = usize;

/// A task body. Runs once per selected target, or once with no target.
pub type TaskFn = Arc<dyn Fn(&mut Session<'_>) -> Result<()> + Send + Sync>;

/// What running a task does.
#[derive(Clone)]
pub enum TaskBody {
    /// Only holds subtasks; running it shows help.
    Namespace,
    /// A closure.
    Run(TaskFn),
    /// A folded group: member task names, run in order.
    Group(Vec<String>),
}

impl TaskBody {
    /// Wrap a closure as a body.
    pub fn run<F>(body: F) -> Self
    where
        F: Fn(&mut Session<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self::Run(Arc::new(body))
    }
}

impl fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace => f.write_str("Namespace"),
            Self::Run(_) => f.write_str("Run(..)"),
            Self::Group(members) => f.debug_tuple("Group").field(members).finish(),
        }
    }
}

/// A named unit of work.
#[derive(Clone)]
pub struct Task {
    pub(crate) name: String,
    pub(crate) short_description: String,
    pub(crate) description: String,
    pub(crate) options: BTreeMap<String, TaskOption>,
    pub(crate) arguments: BTreeMap<String, Argument>,
    pub(crate) body: TaskBody,
    pub(crate) once: bool,
    pub(crate) private: bool,
    pub(crate) only_on: Vec<String>,
    pub(crate) selector: Option<Selector>,
    pub(crate) removed_arguments: HashSet<String>,
    pub(crate) removed_options: HashSet<String>,
    pub(crate) before: Vec<TaskId>,
    pub(crate) after: Vec<TaskId>,
}

impl Task {
    /// Create a task with the given body and no metadata.
    pub fn new(name: impl Into<String>, body: TaskBody) -> Self {
        Self {
            name: name.into(),
            short_description: String::new(),
            description: String::new(),
            options: BTreeMap::new(),
            arguments: BTreeMap::new(),
            body,
            once: false,
            private: false,
            only_on: Vec::new(),
            selector: None,
            removed_arguments: HashSet::new(),
            removed_options: HashSet::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line summary.
    pub fn short_description(&self) -> &str {
        &self.short_description
    }

    /// Long description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Options by name.
    pub fn options(&self) -> &BTreeMap<String, TaskOption> {
        &self.options
    }

    /// Arguments by name.
    pub fn arguments(&self) -> &BTreeMap<String, Argument> {
        &self.arguments
    }

    /// Arguments in positional order.
    pub fn ordered_arguments(&self) -> Vec<&Argument> {
        let mut args: Vec<_> = self.arguments.values().collect();
        args.sort_by_key(|a| (a.sequence, a.name().to_string()));
        args
    }

    /// The body.
    pub fn body(&self) -> &TaskBody {
        &self.body
    }

    /// Whether running does nothing but show help.
    pub fn is_namespace(&self) -> bool {
        matches!(self.body, TaskBody::Namespace)
    }

    /// Whether this is a folded group.
    pub fn is_group(&self) -> bool {
        matches!(self.body, TaskBody::Group(_))
    }

    /// Runs at most once per engine.
    pub fn is_once(&self) -> bool {
        self.once
    }

    /// Hidden from the command line.
    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Restrict list.
    pub fn only_on(&self) -> &[String] {
        &self.only_on
    }

    /// Evaluate the task's selector, if any.
    pub fn selected_targets(&self, inputs: &Inputs) -> Vec<String> {
        self.selector
            .as_ref()
            .map(|selector| selector(inputs))
            .unwrap_or_default()
    }

    /// Tasks run before this one (set at finalize).
    pub fn before(&self) -> &[TaskId] {
        &self.before
    }

    /// Tasks run after this one (set at finalize).
    pub fn after(&self) -> &[TaskId] {
        &self.after
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("body", &self.body)
            .field("once", &self.once)
            .field("private", &self.private)
            .field("only_on", &self.only_on)
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .field("arguments", &self.arguments.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Chained metadata mutators for a task or group.
///
/// Nothing here runs anything; it only shapes how the task is parsed,
/// selected and shown.
pub struct TaskBuilder<'a> {
    task: &'a mut Task,
    sequence: &'a mut usize,
}

impl<'a> TaskBuilder<'a> {
    pub(crate) fn new(task: &'a mut Task, sequence: &'a mut usize) -> Self {
        Self { task, sequence }
    }

    /// One-line summary shown in command lists.
    pub fn short_description(self, text: impl Into<String>) -> Self {
        self.task.short_description = text.into();
        self
    }

    /// Long description shown in the task's help.
    pub fn description(self, text: impl Into<String>) -> Self {
        self.task.description = text.into();
        self
    }

    /// Add or replace an option.
    pub fn add_option(self, option: TaskOption) -> Self {
        self.task.options.insert(option.name().to_string(), option);
        self
    }

    /// Drop an inherited global option.
    pub fn remove_option(self, name: impl Into<String>) -> Self {
        self.task.removed_options.insert(name.into());
        self
    }

    /// Add or replace an argument. It is placed after every argument
    /// declared so far.
    pub fn add_argument(self, mut argument: Argument) -> Self {
        *self.sequence += 1;
        argument.sequence = *self.sequence;
        self.task
            .arguments
            .insert(argument.name().to_string(), argument);
        self
    }

    /// Drop an inherited global argument.
    pub fn remove_argument(self, name: impl Into<String>) -> Self {
        self.task.removed_arguments.insert(name.into());
        self
    }

    /// Run at most once per engine.
    pub fn once(self) -> Self {
        self.task.once = true;
        self
    }

    /// Hide from the command line; still usable from before/after/groups.
    pub fn private(self) -> Self {
        self.task.private = true;
        self
    }

    /// Only run when selection includes one of these targets or roles.
    pub fn only_on_targets<I, S>(self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.ignored_on_group("only_on_targets") {
            return self;
        }
        self.task.only_on = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Compute target names or roles when the task runs.
    pub fn on_targets<F>(self, selector: F) -> Self
    where
        F: Fn(&Inputs) -> Vec<String> + Send + Sync + 'static,
    {
        self.selector(Arc::new(selector))
    }

    /// Install an already shared selector.
    pub fn selector(self, selector: Selector) -> Self {
        if self.ignored_on_group("on_targets") {
            return self;
        }
        self.task.selector = Some(selector);
        self
    }

    /// Groups run their members with the members' own selection.
    fn ignored_on_group(&self, setting: &str) -> bool {
        if self.task.is_group() {
            tracing::warn!(
                "group '{}' ignores {}; set it on its member tasks",
                self.task.name(),
                setting
            );
        }
        self.task.is_group()
    }

    /// Task being configured.
    pub fn task(&self) -> &Task {
        &*self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::params::Kind;

    fn noop() -> TaskBody {
        TaskBody::run(|_| Ok(()))
    }

    #[test]
    fn builder_sets_metadata() {
        let mut task = Task::new("deploy", noop());
        let mut seq = 0;
        TaskBuilder::new(&mut task, &mut seq)
            .short_description("Deploy the app")
            .description("Long text")
            .once()
            .private()
            .only_on_targets(["p1", "p2"]);

        assert_eq!(task.short_description(), "Deploy the app");
        assert_eq!(task.description(), "Long text");
        assert!(task.is_once());
        assert!(task.is_private());
        assert_eq!(task.only_on(), &["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn arguments_are_ordered_by_registration() {
        let mut task = Task::new("copy", noop());
        let mut seq = 10;
        TaskBuilder::new(&mut task, &mut seq)
            .add_argument(Argument::new("src", ""))
            .add_argument(Argument::new("dest", ""))
            .add_argument(Argument::new("count", "").kind(Kind::Int));

        let names: Vec<_> = task.ordered_arguments().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["src", "dest", "count"]);
        assert_eq!(seq, 13);
    }

    #[test]
    fn selector_sees_inputs() {
        let mut task = Task::new("deploy", noop());
        let mut seq = 0;
        TaskBuilder::new(&mut task, &mut seq).on_targets(|inputs| {
            vec![inputs.string("stage").unwrap_or_default()]
        });

        let mut inputs = Inputs::new();
        inputs.set("stage", "prod");
        assert_eq!(task.selected_targets(&inputs), vec!["prod"]);
    }

    #[test]
    fn no_selector_selects_nothing() {
        let task = Task::new("x", noop());
        assert!(task.selected_targets(&Inputs::new()).is_empty());
    }

    #[test]
    fn removals_are_recorded() {
        let mut task = Task::new("x", noop());
        let mut seq = 0;
        TaskBuilder::new(&mut task, &mut seq)
            .remove_argument("stage")
            .remove_option("verbose");
        assert!(task.removed_arguments.contains("stage"));
        assert!(task.removed_options.contains("verbose"));
    }

    #[test]
    fn groups_ignore_target_selection() {
        let mut group = Task::new("ci", TaskBody::Group(vec!["lint".into()]));
        let mut seq = 0;
        TaskBuilder::new(&mut group, &mut seq)
            .only_on_targets(["p1"])
            .on_targets(|_| vec!["prod".to_string()])
            .short_description("Checks");

        assert!(group.only_on().is_empty());
        assert!(group.selected_targets(&Inputs::new()).is_empty());
        assert_eq!(group.short_description(), "Checks");
    }

    #[test]
    fn body_kinds() {
        assert!(Task::new("ns", TaskBody::Namespace).is_namespace());
        assert!(Task::new("g", TaskBody::Group(vec!["a".into()])).is_group());
        assert!(!Task::new("t", noop()).is_group());
    }
}
