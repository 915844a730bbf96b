//! The finalized engine and its dispatch state machine.
//!
//! ```text
//! Idle -> Dispatching -> Running(task) -> RunningOnTarget(task, target)* -> Idle
//! ```
//!
//! A dispatch finds the task, parses its inputs, then runs the `onStart`
//! hook, the task's before-tasks, its body (fanned out over the selected
//! targets), its after-tasks and the `onEnd` hook. Groups re-enter the same
//! path for each member, so nested groups compose.

use std::collections::HashSet;

use crate::config::ConfigStore;
use crate::error::{Result, StagehandError};
use crate::remote::ConnectionPool;
use crate::targets::{fan_out, select, Selection, Selector, TargetRegistry};
use crate::tasks::{parse_inputs, DispatchTree, Help, Inputs, Task, TaskBody, TaskFn, TaskId, TaskTable};
use crate::ui::UserInterface;

use super::session::Session;

/// Task run before every dispatch, if declared.
pub const ON_START: &str = "onStart";

/// Task run after every successful dispatch, if declared.
pub const ON_END: &str = "onEnd";

/// Mutable state of a run. Kept apart from the frozen task table so bodies
/// can borrow it while the table stays shared.
pub(crate) struct Runtime {
    pub(crate) config: ConfigStore,
    pub(crate) targets: TargetRegistry,
    pub(crate) default_selector: Option<Selector>,
    pub(crate) pool: ConnectionPool,
    pub(crate) ui: Box<dyn UserInterface>,
    pub(crate) inputs: Inputs,
    executed: HashSet<TaskId>,
    running: Vec<TaskId>,
}

impl Runtime {
    pub(crate) fn new(
        config: ConfigStore,
        targets: TargetRegistry,
        default_selector: Option<Selector>,
        pool: ConnectionPool,
        ui: Box<dyn UserInterface>,
    ) -> Self {
        Self {
            config,
            targets,
            default_selector,
            pool,
            ui,
            inputs: Inputs::new(),
            executed: HashSet::new(),
            running: Vec::new(),
        }
    }

    fn is_exhausted(&self, task: &Task, id: TaskId) -> bool {
        task.is_once() && self.executed.contains(&id)
    }

    fn execute(&mut self, table: &TaskTable, id: TaskId) -> Result<()> {
        self.hook(table, ON_START, id)?;
        self.run_task(table, id)?;
        self.hook(table, ON_END, id)
    }

    fn hook(&mut self, table: &TaskTable, name: &str, dispatched: TaskId) -> Result<()> {
        match table.id(name) {
            Some(hook) if hook != dispatched => self.run_task(table, hook),
            _ => Ok(()),
        }
    }

    fn run_task(&mut self, table: &TaskTable, id: TaskId) -> Result<()> {
        let task = table.get(id);
        if self.is_exhausted(task, id) {
            tracing::debug!("skipping '{}': already ran", task.name());
            return Ok(());
        }
        if self.running.contains(&id) {
            tracing::warn!("skipping '{}': it depends on itself", task.name());
            return Ok(());
        }

        self.running.push(id);
        let result = self.run_in_order(table, id, task);
        self.running.pop();
        result
    }

    fn run_in_order(&mut self, table: &TaskTable, id: TaskId, task: &Task) -> Result<()> {
        for &before in task.before() {
            self.run_task(table, before)?;
        }
        if self.run_body(table, task)? {
            self.executed.insert(id);
        }
        for &after in task.after() {
            self.run_task(table, after)?;
        }
        Ok(())
    }

    /// Returns whether the body was entered.
    fn run_body(&mut self, table: &TaskTable, task: &Task) -> Result<bool> {
        match task.body() {
            TaskBody::Namespace => Ok(false),
            TaskBody::Group(members) => {
                self.ui.group(task.name());
                for member in members {
                    match table.id(member) {
                        Some(id) => self.run_task(table, id)?,
                        None => {
                            tracing::debug!("group '{}' skips unknown task '{}'", task.name(), member)
                        }
                    }
                }
                Ok(true)
            }
            TaskBody::Run(body) => self.run_on_targets(task, body),
        }
    }

    fn run_on_targets(&mut self, task: &Task, body: &TaskFn) -> Result<bool> {
        let default = self
            .default_selector
            .as_ref()
            .map(|selector| selector(&self.inputs))
            .unwrap_or_default();
        let selected = task.selected_targets(&self.inputs);

        let entries = match select(&self.targets, default, selected, task.only_on(), false) {
            Selection::Run(entries) => entries,
            Selection::Denied(allowed) => {
                self.ui.info(&format!(
                    "Task `{}` can run only on [{}]",
                    task.name(),
                    allowed.join(", ")
                ));
                return Ok(false);
            }
            Selection::Exhausted => return Ok(false),
        };

        if entries.is_empty() {
            self.ui.task(task.name(), None);
            self.invoke(task, body, None)?;
            return Ok(true);
        }

        let targets: Vec<String> = fan_out(&self.targets, &entries)
            .into_iter()
            .map(|t| t.name().to_string())
            .collect();
        if targets.is_empty() {
            tracing::warn!(
                "task '{}': no target matches [{}]",
                task.name(),
                entries.join(", ")
            );
            return Ok(false);
        }

        for target in targets {
            self.ui.task(task.name(), Some(target.as_str()));
            self.invoke(task, body, Some(target))?;
        }
        Ok(true)
    }

    fn invoke(&mut self, task: &Task, body: &TaskFn, target: Option<String>) -> Result<()> {
        let mut session = Session::new(self, task, target);
        body(&mut session)
    }
}

/// A finalized set of tasks, ready to dispatch command lines.
///
/// Built by [`Stagehand::finalize`](super::Stagehand::finalize). Task
/// identity and ordering are frozen; configuration and run-once state live
/// for as long as the engine does, across dispatches.
pub struct Engine {
    program: String,
    table: TaskTable,
    tree: DispatchTree,
    runtime: Runtime,
}

impl Engine {
    pub(crate) fn new(program: String, mut table: TaskTable, root: Task, runtime: Runtime) -> Self {
        let tree = DispatchTree::build(&mut table, root);
        Self {
            program,
            table,
            tree,
            runtime,
        }
    }

    /// Run the task named by `args`.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` when the words name no task or the task's flags
    /// or arguments do not parse (help is shown first), or whatever a task
    /// body returned.
    pub fn dispatch<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let found = self.tree.find(&args);
        let task = self.table.get(found.task);
        tracing::debug!("dispatching '{}' with {:?}", task.name(), found.args);

        if task.is_namespace() {
            let help = self.help_for(found.task, &found.path);
            self.runtime.ui.help(&help);
            return match found.args.iter().find(|a| !a.starts_with('-')) {
                Some(unknown) => Err(StagehandError::InvalidParameters {
                    task: task.name().to_string(),
                    message: format!("unknown command `{}`", unknown),
                }),
                None => Ok(()),
            };
        }

        let inputs = match parse_inputs(task, &found.args) {
            Ok(inputs) => inputs,
            Err(e) => {
                let help = self.help_for(found.task, &found.path);
                self.runtime.ui.help(&help);
                return Err(e);
            }
        };

        if inputs.flag("help") {
            let help = self.help_for(found.task, &found.path);
            self.runtime.ui.help(&help);
            return Ok(());
        }

        if self.runtime.is_exhausted(task, found.task) {
            tracing::debug!("'{}' already ran", task.name());
            return Ok(());
        }

        self.runtime.inputs = inputs;
        self.runtime.execute(&self.table, found.task)?;

        let closed = self.runtime.pool.close_all();
        if closed > 0 {
            tracing::debug!("closed {} connection(s)", closed);
        }
        Ok(())
    }

    /// Help for the task `path` leads to.
    pub fn help<S: AsRef<str>>(&self, path: &[S]) -> Help {
        let words: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
        let found = self.tree.find(&words);
        self.help_for(found.task, &found.path)
    }

    fn help_for(&self, id: TaskId, path: &[String]) -> Help {
        let full = std::iter::once(self.program.as_str())
            .chain(path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        let commands = self
            .tree
            .children_of(id)
            .into_iter()
            .map(|(name, child)| (name, self.table.get(child).short_description().to_string()))
            .collect();
        Help::new(full, self.table.get(id), commands)
    }

    /// Finalized tasks.
    pub fn tasks(&self) -> &TaskTable {
        &self.table
    }

    /// Declared targets.
    pub fn targets(&self) -> &TargetRegistry {
        &self.runtime.targets
    }

    /// Global configuration, including values set by task bodies.
    pub fn config(&self) -> &ConfigStore {
        &self.runtime.config
    }

    /// Inputs parsed by the most recent dispatch.
    pub fn inputs(&self) -> &Inputs {
        &self.runtime.inputs
    }

    /// Whether the body of task `name` has run in this engine.
    pub fn has_run(&self, name: &str) -> bool {
        self.table
            .id(name)
            .is_some_and(|id| self.runtime.executed.contains(&id))
    }

    /// Connections currently open.
    pub fn open_connections(&self) -> usize {
        self.runtime.pool.open_count()
    }
}
