//! Deciding where a task body runs.
//!
//! The effective target list of a task is computed from, in order:
//!
//! 1. the engine-wide default selector
//! 2. the task's own selector, when it returns something
//! 3. the task's restrict list, which both gates the run and replaces the list
//!
//! A once-flagged task that already ran is exhausted regardless.

use std::sync::Arc;

use crate::tasks::Inputs;

use super::registry::{Target, TargetRegistry};

/// A dynamically computed list of target names or roles.
///
/// Selectors see the parsed task inputs so the list can depend on arguments
/// and options.
pub type Selector = Arc<dyn Fn(&Inputs) -> Vec<String> + Send + Sync>;

/// Outcome of target selection for one task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Run against targets matching these entries (none: run once locally).
    Run(Vec<String>),
    /// The restrict list matched nothing that was selected.
    Denied(Vec<String>),
    /// A once-flagged task that already ran.
    Exhausted,
}

/// Compute the selection for a task.
///
/// `default` is the engine-wide selector result, `selected` the task's own
/// selector result and `only_on` its restrict list.
pub fn select(
    registry: &TargetRegistry,
    default: Vec<String>,
    selected: Vec<String>,
    only_on: &[String],
    exhausted: bool,
) -> Selection {
    if exhausted {
        return Selection::Exhausted;
    }

    let resolved = if selected.is_empty() { default } else { selected };

    if only_on.is_empty() {
        return Selection::Run(resolved);
    }

    let allowed = resolved.iter().any(|name| {
        only_on
            .iter()
            .any(|restricted| restrict_matches(registry, name, restricted))
    });

    if allowed {
        Selection::Run(only_on.to_vec())
    } else {
        Selection::Denied(only_on.to_vec())
    }
}

/// Equal names, or either name is a target carrying the other as a role.
fn restrict_matches(registry: &TargetRegistry, resolved: &str, restricted: &str) -> bool {
    resolved == restricted
        || registry
            .get(resolved)
            .is_some_and(|t| t.has_role(restricted))
        || registry
            .get(restricted)
            .is_some_and(|t| t.has_role(resolved))
}

/// Targets the body fans out to for an effective list.
pub fn fan_out<'a>(registry: &'a TargetRegistry, entries: &[String]) -> Vec<&'a Target> {
    registry.matching(entries)
}
