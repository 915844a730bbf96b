//! Finalize-time assembly of declared tasks into a frozen table.
//!
//! Assembly happens once, in this order:
//!
//! 1. every task and group inherits the global arguments and options it did
//!    not remove (its own declarations win) plus the implicit `help` flag
//! 2. groups are folded into the table; a group replaces a same-named task
//! 3. before/after names are resolved to ids over the folded table, so they
//!    may point at groups; unknown names are dropped
//!
//! The [`DispatchTree`] then maps command-line words to tasks.

use std::collections::{BTreeMap, HashMap};

use super::params::{help_option, Argument, TaskOption};
use super::task::{Task, TaskBody, TaskId};

/// Finalized tasks, addressable by id or name.
#[derive(Debug, Default)]
pub struct TaskTable {
    tasks: Vec<Task>,
    by_name: HashMap<String, TaskId>,
}

impl TaskTable {
    /// Task by id.
    ///
    /// Ids only come from this table, so they are always in range.
    pub fn get(&self, id: TaskId) -> &Task {
        &self.tasks[id]
    }

    /// Id of a named task.
    pub fn id(&self, name: &str) -> Option<TaskId> {
        self.by_name.get(name).copied()
    }

    /// Task by name.
    pub fn find(&self, name: &str) -> Option<&Task> {
        self.id(name).map(|id| self.get(id))
    }

    /// Named tasks, in declaration order (groups after tasks).
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(id, task)| self.by_name.get(task.name()) == Some(id))
    }

    /// Number of named tasks.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no task is declared.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn insert(&mut self, task: Task) -> TaskId {
        match self.by_name.get(task.name()) {
            Some(&id) => {
                self.tasks[id] = task;
                id
            }
            None => {
                let id = self.push_unnamed(task);
                self.by_name.insert(self.tasks[id].name().to_string(), id);
                id
            }
        }
    }

    /// Add a task reachable only through its id (dispatch namespaces).
    fn push_unnamed(&mut self, task: Task) -> TaskId {
        self.tasks.push(task);
        self.tasks.len() - 1
    }
}

/// Everything declared before finalize.
#[derive(Debug, Default)]
pub struct Declarations {
    /// Tasks in declaration order.
    pub tasks: Vec<Task>,
    /// Groups in declaration order.
    pub groups: Vec<Task>,
    /// Global arguments.
    pub arguments: BTreeMap<String, Argument>,
    /// Global options.
    pub options: BTreeMap<String, TaskOption>,
    /// `before` references, by task name.
    pub before: Vec<(String, Vec<String>)>,
    /// `after` references, by task name.
    pub after: Vec<(String, Vec<String>)>,
}

/// Inherit global parameters, keeping the task's own on collision.
pub fn merge_parameters(
    task: &mut Task,
    arguments: &BTreeMap<String, Argument>,
    options: &BTreeMap<String, TaskOption>,
) {
    for (name, argument) in arguments {
        if task.removed_arguments.contains(name) {
            continue;
        }
        task.arguments
            .entry(name.clone())
            .or_insert_with(|| argument.clone());
    }
    for (name, option) in options {
        if task.removed_options.contains(name) {
            continue;
        }
        task.options
            .entry(name.clone())
            .or_insert_with(|| option.clone());
    }
    task.options
        .entry("help".to_string())
        .or_insert_with(help_option);
}

/// Run assembly steps 1 to 3 and return the frozen table.
pub fn assemble(declarations: Declarations) -> TaskTable {
    let Declarations {
        tasks,
        groups,
        arguments,
        options,
        before,
        after,
    } = declarations;

    let mut table = TaskTable::default();

    for mut task in tasks {
        merge_parameters(&mut task, &arguments, &options);
        table.insert(task);
    }

    for mut group in groups {
        merge_parameters(&mut group, &arguments, &options);
        if table.find(group.name()).is_some_and(|t| !t.is_group()) {
            tracing::warn!(
                "group '{}' replaces the task with the same name",
                group.name()
            );
        }
        table.insert(group);
    }

    for (name, refs) in &before {
        let ids = resolve(&table, name, refs);
        if let Some(id) = table.id(name) {
            extend_unique(&mut table.tasks[id].before, ids);
        }
    }
    for (name, refs) in &after {
        let ids = resolve(&table, name, refs);
        if let Some(id) = table.id(name) {
            extend_unique(&mut table.tasks[id].after, ids);
        }
    }

    table
}

fn resolve(table: &TaskTable, owner: &str, refs: &[String]) -> Vec<TaskId> {
    if table.id(owner).is_none() {
        tracing::debug!("before/after declared for unknown task '{}'", owner);
    }
    refs.iter()
        .filter_map(|name| {
            let id = table.id(name);
            if id.is_none() {
                tracing::debug!("'{}' references unknown task '{}'", owner, name);
            }
            id
        })
        .collect()
}

fn extend_unique(ids: &mut Vec<TaskId>, more: Vec<TaskId>) {
    for id in more {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
}

#[derive(Debug)]
struct Node {
    task: TaskId,
    children: BTreeMap<String, usize>,
}

/// Maps command-line words to tasks.
///
/// Dotted names nest: `db.migrate` lives under a `db` node and is reachable
/// as either `db migrate` or `db.migrate`. Nodes with no task of their own
/// get a namespace task that only shows help. Private tasks are left out.
#[derive(Debug)]
pub struct DispatchTree {
    nodes: Vec<Node>,
}

/// Where a dispatch landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    /// Task to run.
    pub task: TaskId,
    /// Words that led to it.
    pub path: Vec<String>,
    /// Remaining words: the task's own flags and arguments.
    pub args: Vec<String>,
}

impl DispatchTree {
    /// Build the tree, adding namespace tasks to `table`.
    ///
    /// `root` is the pseudo-task reached with no words (global parameters).
    pub fn build(table: &mut TaskTable, root: Task) -> Self {
        let root = table.push_unnamed(root);
        let mut tree = Self {
            nodes: vec![Node {
                task: root,
                children: BTreeMap::new(),
            }],
        };

        let visible: Vec<(TaskId, String)> = table
            .iter()
            .filter(|(_, task)| !task.is_private())
            .map(|(id, task)| (id, task.name().to_string()))
            .collect();

        for (id, name) in visible {
            let segments: Vec<&str> = name.split('.').filter(|s| !s.is_empty()).collect();
            if segments.is_empty() {
                continue;
            }
            let mut node = 0;
            for (depth, segment) in segments.iter().enumerate() {
                node = match tree.nodes[node].children.get(*segment) {
                    Some(&child) => child,
                    None => {
                        let namespace = Task::new(segments[..=depth].join("."), TaskBody::Namespace);
                        let task = table.push_unnamed(namespace);
                        tree.nodes.push(Node {
                            task,
                            children: BTreeMap::new(),
                        });
                        let child = tree.nodes.len() - 1;
                        tree.nodes[node]
                            .children
                            .insert((*segment).to_string(), child);
                        child
                    }
                };
            }
            tree.nodes[node].task = id;
        }

        tree
    }

    /// The root pseudo-task.
    pub fn root(&self) -> TaskId {
        self.nodes[0].task
    }

    /// Walk `args` down the tree.
    ///
    /// Each word is split on dots and followed segment by segment; the walk
    /// stops at the first word that is a flag or does not fully match.
    pub fn find(&self, args: &[String]) -> Found {
        let mut node = 0;
        let mut consumed = 0;

        for word in args {
            if word.starts_with('-') {
                break;
            }
            match self.walk(node, word) {
                Some(next) => {
                    node = next;
                    consumed += 1;
                }
                None => break,
            }
        }

        Found {
            task: self.nodes[node].task,
            path: args[..consumed].to_vec(),
            args: args[consumed..].to_vec(),
        }
    }

    fn walk(&self, from: usize, word: &str) -> Option<usize> {
        let mut node = from;
        for segment in word.split('.') {
            node = *self.nodes[node].children.get(segment)?;
        }
        Some(node)
    }

    /// Subcommands under the node a task sits at, sorted by name.
    pub fn children_of(&self, task: TaskId) -> Vec<(String, TaskId)> {
        self.nodes
            .iter()
            .find(|n| n.task == task)
            .map(|n| {
                n.children
                    .iter()
                    .map(|(name, &child)| (name.clone(), self.nodes[child].task))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str) -> Task {
        Task::new(name, TaskBody::run(|_| Ok(())))
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn globals_are_merged_unless_removed() {
        let mut arguments = BTreeMap::new();
        arguments.insert("stage".to_string(), Argument::new("stage", "Stage"));
        let mut options = BTreeMap::new();
        options.insert("v".to_string(), TaskOption::flag("v", "Verbose"));

        let mut kept = task("kept");
        merge_parameters(&mut kept, &arguments, &options);
        assert!(kept.arguments().contains_key("stage"));
        assert!(kept.options().contains_key("v"));
        assert!(kept.options().contains_key("help"));

        let mut removed = task("removed");
        removed.removed_arguments.insert("stage".into());
        removed.removed_options.insert("v".into());
        merge_parameters(&mut removed, &arguments, &options);
        assert!(!removed.arguments().contains_key("stage"));
        assert!(!removed.options().contains_key("v"));
    }

    #[test]
    fn own_declaration_wins_over_global() {
        let mut arguments = BTreeMap::new();
        arguments.insert("stage".to_string(), Argument::new("stage", "global"));
        let mut own = task("own");
        own.arguments
            .insert("stage".into(), Argument::new("stage", "local"));
        merge_parameters(&mut own, &arguments, &BTreeMap::new());
        assert_eq!(own.arguments()["stage"].description(), "local");
    }

    #[test]
    fn group_replaces_task_with_same_name() {
        let table = assemble(Declarations {
            tasks: vec![task("release"), task("build")],
            groups: vec![Task::new("release", TaskBody::Group(words(&["build"])))],
            ..Default::default()
        });
        assert_eq!(table.len(), 2);
        assert!(table.find("release").unwrap().is_group());
    }

    #[test]
    fn before_after_resolve_and_drop_unknown() {
        let table = assemble(Declarations {
            tasks: vec![task("deploy"), task("lock"), task("unlock")],
            groups: vec![Task::new("notify", TaskBody::Group(vec![]))],
            before: vec![("deploy".into(), words(&["lock", "ghost", "lock"]))],
            after: vec![("deploy".into(), words(&["unlock", "notify"]))],
            ..Default::default()
        });
        let deploy = table.find("deploy").unwrap();
        let before: Vec<_> = deploy.before().iter().map(|&id| table.get(id).name()).collect();
        let after: Vec<_> = deploy.after().iter().map(|&id| table.get(id).name()).collect();
        assert_eq!(before, vec!["lock"]);
        assert_eq!(after, vec!["unlock", "notify"]);
    }

    #[test]
    fn tree_finds_plain_and_dotted_names() {
        let mut table = assemble(Declarations {
            tasks: vec![task("deploy"), task("db.migrate")],
            ..Default::default()
        });
        let tree = DispatchTree::build(&mut table, Task::new("", TaskBody::Namespace));

        let found = tree.find(&words(&["deploy", "prod"]));
        assert_eq!(table.get(found.task).name(), "deploy");
        assert_eq!(found.args, words(&["prod"]));

        let spaced = tree.find(&words(&["db", "migrate", "--force"]));
        assert_eq!(table.get(spaced.task).name(), "db.migrate");
        assert_eq!(spaced.path, words(&["db", "migrate"]));
        assert_eq!(spaced.args, words(&["--force"]));

        let dotted = tree.find(&words(&["db.migrate"]));
        assert_eq!(dotted.task, spaced.task);
    }

    #[test]
    fn tree_creates_namespace_nodes() {
        let mut table = assemble(Declarations {
            tasks: vec![task("db.migrate"), task("db.seed")],
            ..Default::default()
        });
        let tree = DispatchTree::build(&mut table, Task::new("", TaskBody::Namespace));

        let found = tree.find(&words(&["db"]));
        let db = table.get(found.task);
        assert!(db.is_namespace());
        assert_eq!(db.name(), "db");

        let children: Vec<_> = tree
            .children_of(found.task)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(children, words(&["migrate", "seed"]));
    }

    #[test]
    fn tree_skips_private_tasks() {
        let mut hidden = task("hidden");
        hidden.private = true;
        let mut table = assemble(Declarations {
            tasks: vec![hidden],
            ..Default::default()
        });
        let tree = DispatchTree::build(&mut table, Task::new("", TaskBody::Namespace));
        let found = tree.find(&words(&["hidden"]));
        assert_eq!(found.task, tree.root());
        assert_eq!(found.args, words(&["hidden"]));
    }

    #[test]
    fn namespace_tasks_are_not_named() {
        let mut table = assemble(Declarations {
            tasks: vec![task("db.migrate")],
            ..Default::default()
        });
        DispatchTree::build(&mut table, Task::new("", TaskBody::Namespace));
        assert!(table.find("db").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_words_stay_as_args() {
        let mut table = assemble(Declarations {
            tasks: vec![task("deploy")],
            ..Default::default()
        });
        let tree = DispatchTree::build(&mut table, Task::new("", TaskBody::Namespace));
        let found = tree.find(&words(&["nope", "deploy"]));
        assert_eq!(found.task, tree.root());
        assert_eq!(found.args.len(), 2);
    }
}
