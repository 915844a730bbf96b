//! Declaring configuration, targets and tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{self, ConfigEntry, ConfigStore, ConfigValue};
use crate::error::Result;
use crate::remote::{ConnectionPool, SshTransport, Transport};
use crate::targets::{Selector, TargetBuilder, TargetRegistry};
use crate::tasks::{
    assemble, merge_parameters, Argument, Declarations, Inputs, Task, TaskBody, TaskBuilder,
    TaskOption,
};
use crate::ui::{should_use_colors, TerminalUI, UserInterface};

use super::engine::{Engine, Runtime};
use super::session::Session;

/// Program name shown in help when none is set.
pub const DEFAULT_PROGRAM: &str = "stagehand";

/// Collects declarations until [`finalize`](Self::finalize).
///
/// # Example
///
/// ```
/// use stagehand::remote::MockTransport;
/// use stagehand::runner::Stagehand;
/// use stagehand::ui::MockUI;
///
/// let ui = MockUI::new();
/// let transport = MockTransport::new();
/// let mut stagehand = Stagehand::new()
///     .with_ui(ui.clone())
///     .with_transport(transport.clone());
///
/// stagehand.target("p1", "deploy@10.0.0.1").unwrap().add_role("prod");
/// stagehand.task("uptime", |s| s.remote("uptime").map(|_| ()))
///     .on_targets(|_| vec!["prod".to_string()]);
///
/// stagehand.run(["uptime"]).unwrap();
/// assert_eq!(transport.commands_for("p1"), vec!["uptime"]);
/// ```
pub struct Stagehand {
    program: String,
    config: ConfigStore,
    targets: TargetRegistry,
    tasks: Vec<Task>,
    groups: Vec<Task>,
    arguments: BTreeMap<String, Argument>,
    options: BTreeMap<String, TaskOption>,
    sequence: usize,
    before: Vec<(String, Vec<String>)>,
    after: Vec<(String, Vec<String>)>,
    default_selector: Option<Selector>,
    ui: Box<dyn UserInterface>,
    transport: Box<dyn Transport>,
}

impl Stagehand {
    /// Start with a terminal UI and the OpenSSH transport.
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            config: ConfigStore::new(),
            targets: TargetRegistry::new(),
            tasks: Vec::new(),
            groups: Vec::new(),
            arguments: BTreeMap::new(),
            options: BTreeMap::new(),
            sequence: 0,
            before: Vec::new(),
            after: Vec::new(),
            default_selector: None,
            ui: Box::new(TerminalUI::new(should_use_colors())),
            transport: Box::new(SshTransport::new()),
        }
    }

    /// Use `ui` for all output and prompts.
    pub fn with_ui(mut self, ui: impl UserInterface + 'static) -> Self {
        self.ui = Box::new(ui);
        self
    }

    /// Use an already boxed UI.
    pub fn with_boxed_ui(mut self, ui: Box<dyn UserInterface>) -> Self {
        self.ui = ui;
        self
    }

    /// Open remote connections through `transport`.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    /// Name shown at the start of usage lines.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set a global value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ConfigValue>) -> &mut Self {
        self.config.set(name, value);
        self
    }

    /// Set a global value computed on first read.
    pub fn set_lazy<F, V>(&mut self, name: impl Into<String>, producer: F) -> &mut Self
    where
        F: FnOnce() -> V + Send + 'static,
        V: Into<ConfigValue>,
    {
        self.config.set_lazy(name, producer);
        self
    }

    /// Global config entry.
    pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
        self.config.get(name)
    }

    /// Whether a global entry exists.
    pub fn has(&self, name: &str) -> bool {
        self.config.has(name)
    }

    /// Expand placeholders against the global store.
    pub fn parse(&self, text: &str) -> Result<String> {
        config::parse(text, &self.config)
    }

    /// Register a target at `host` (`[ssh://][user@]host[:port]`).
    ///
    /// # Errors
    ///
    /// `InvalidHost` when the descriptor does not parse.
    pub fn target(&mut self, name: &str, host: &str) -> Result<TargetBuilder<'_>> {
        self.targets.register(name, host)
    }

    /// Declared targets.
    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    /// Declare a task. Declaring a name again replaces the earlier task.
    pub fn task<F>(&mut self, name: impl Into<String>, body: F) -> TaskBuilder<'_>
    where
        F: Fn(&mut Session<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.declare_task(Task::new(name, TaskBody::run(body)))
    }

    /// Declare a task from an already built [`Task`].
    pub fn declare_task(&mut self, task: Task) -> TaskBuilder<'_> {
        let index = replace_or_push(&mut self.tasks, task);
        TaskBuilder::new(&mut self.tasks[index], &mut self.sequence)
    }

    /// Declare a group running `members` in order.
    pub fn group<I, S>(&mut self, name: impl Into<String>, members: I) -> TaskBuilder<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members = members.into_iter().map(Into::into).collect();
        let index = replace_or_push(&mut self.groups, Task::new(name, TaskBody::Group(members)));
        TaskBuilder::new(&mut self.groups[index], &mut self.sequence)
    }

    /// Add an argument every task inherits.
    ///
    /// The first registration of a name wins; later ones are ignored.
    pub fn add_argument(&mut self, mut argument: Argument) -> &mut Self {
        if !self.arguments.contains_key(argument.name()) {
            self.sequence += 1;
            argument.sequence = self.sequence;
            self.arguments
                .insert(argument.name().to_string(), argument);
        }
        self
    }

    /// Add an option every task inherits. The first registration wins.
    pub fn add_option(&mut self, option: TaskOption) -> &mut Self {
        self.options
            .entry(option.name().to_string())
            .or_insert(option);
        self
    }

    /// A global argument.
    pub fn get_argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.get(name)
    }

    /// A global option.
    pub fn get_option(&self, name: &str) -> Option<&TaskOption> {
        self.options.get(name)
    }

    /// Run `names` before `task`.
    pub fn before<I, S>(&mut self, task: &str, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        add_references(&mut self.before, task, names);
        self
    }

    /// Run `names` after `task`.
    pub fn after<I, S>(&mut self, task: &str, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        add_references(&mut self.after, task, names);
        self
    }

    /// Targets every task runs on unless its own selector says otherwise.
    pub fn on_targets<F>(&mut self, selector: F) -> &mut Self
    where
        F: Fn(&Inputs) -> Vec<String> + Send + Sync + 'static,
    {
        self.default_selector = Some(Arc::new(selector));
        self
    }

    /// Install an already shared default selector.
    pub fn default_selector(&mut self, selector: Selector) -> &mut Self {
        self.default_selector = Some(selector);
        self
    }

    /// Freeze the declarations into an [`Engine`].
    pub fn finalize(self) -> Engine {
        let Self {
            program,
            config,
            targets,
            tasks,
            groups,
            arguments,
            options,
            before,
            after,
            default_selector,
            ui,
            transport,
            ..
        } = self;

        let mut root = Task::new(program.clone(), TaskBody::Namespace);
        merge_parameters(&mut root, &arguments, &options);

        let table = assemble(Declarations {
            tasks,
            groups,
            arguments,
            options,
            before,
            after,
        });
        tracing::debug!("finalized {} task(s)", table.len());

        let runtime = Runtime::new(
            config,
            targets,
            default_selector,
            ConnectionPool::new(transport),
            ui,
        );
        Engine::new(program, table, root, runtime)
    }

    /// Finalize and dispatch `args`.
    pub fn run<I, S>(self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.finalize().dispatch(args)
    }
}

impl Default for Stagehand {
    fn default() -> Self {
        Self::new()
    }
}

fn replace_or_push(tasks: &mut Vec<Task>, task: Task) -> usize {
    match tasks.iter().position(|t| t.name() == task.name()) {
        Some(index) => {
            tracing::debug!("'{}' declared again; replacing it", task.name());
            tasks[index] = task;
            index
        }
        None => {
            tasks.push(task);
            tasks.len() - 1
        }
    }
}

fn add_references<I, S>(list: &mut Vec<(String, Vec<String>)>, task: &str, names: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let index = match list.iter().position(|(owner, _)| owner == task) {
        Some(index) => index,
        None => {
            list.push((task.to_string(), Vec::new()));
            list.len() - 1
        }
    };
    let refs = &mut list[index].1;
    for name in names {
        let name = name.into();
        if !refs.contains(&name) {
            refs.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockTransport;
    use crate::tasks::Kind;
    use crate::ui::MockUI;

    fn stagehand() -> (Stagehand, MockUI) {
        let ui = MockUI::new();
        let stagehand = Stagehand::new()
            .with_ui(ui.clone())
            .with_transport(MockTransport::new());
        (stagehand, ui)
    }

    #[test]
    fn redeclaring_a_task_replaces_it() {
        let (mut sh, ui) = stagehand();
        sh.task("greet", |s| s.println("first"));
        sh.task("greet", |s| s.println("second"));

        sh.run(["greet"]).unwrap();

        assert_eq!(ui.messages(), vec!["second"]);
    }

    #[test]
    fn global_arguments_keep_first_position() {
        let (mut sh, _) = stagehand();
        sh.add_argument(Argument::new("stage", "Stage"));
        sh.add_argument(Argument::new("branch", "Branch"));
        sh.add_argument(Argument::new("stage", "Stage again").kind(Kind::String));

        let stage = sh.get_argument("stage").unwrap();
        let branch = sh.get_argument("branch").unwrap();
        assert!(stage.sequence() < branch.sequence());
        assert_eq!(stage.description(), "Stage");
    }

    #[test]
    fn references_are_deduplicated() {
        let mut list = Vec::new();
        add_references(&mut list, "deploy", ["build", "test"]);
        add_references(&mut list, "deploy", ["build", "lint"]);
        assert_eq!(
            list,
            vec![(
                "deploy".to_string(),
                vec!["build".to_string(), "test".to_string(), "lint".to_string()]
            )]
        );
    }

    #[test]
    fn global_options_reach_every_task() {
        let (mut sh, ui) = stagehand();
        sh.add_option(TaskOption::flag("v", "Verbose"));
        sh.task("status", |s| {
            let verbose = s.flag("v");
            s.println(&format!("verbose={}", verbose))
        });

        sh.run(["status", "-v"]).unwrap();

        assert_eq!(ui.messages(), vec!["verbose=true"]);
    }

    #[test]
    fn parse_uses_global_store() {
        let (mut sh, _) = stagehand();
        sh.set("app", "shop").set("dir", "/srv/{{app}}");
        assert_eq!(sh.parse("cd {{dir}}").unwrap(), "cd /srv/shop");
        assert!(sh.has("app"));
        assert_eq!(sh.get("app").unwrap().as_string(), "shop");
    }
}
