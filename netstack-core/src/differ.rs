//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the resources declared by the stack with the states recorded
//! after the last apply, and generates the Effects needed to converge.

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::graph::{StateMap, resolve_resource, sort_by_dependencies};
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state, sorted by name
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }

        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Compute the Plan converging `current` to `desired`.
///
/// `current` is in creation order. Creates and updates follow dependency
/// order; resources no longer declared are deleted last, newest first.
pub fn create_plan(desired: &[Resource], current: &[State]) -> Plan {
    let mut plan = Plan::new();
    let declared: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();

    // A replaced resource can share its name with the declared one
    let (kept, replaced): (Vec<&State>, Vec<&State>) = current
        .iter()
        .filter(|s| s.exists)
        .partition(|s| declared.contains(&s.id));
    let known: StateMap = replaced
        .into_iter()
        .chain(kept)
        .map(|s| (s.id.name.clone(), s.clone()))
        .collect();

    for resource in sort_by_dependencies(desired) {
        let state = known
            .get(resource.name())
            .filter(|s| s.id == resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        // Compare against resolved values, since states record resolved ones
        let resolved = resolve_resource(&resource, &known);
        match diff(&resolved, &state) {
            Diff::Create(_) => plan.add(Effect::Create(resource)),
            Diff::Update {
                id,
                from,
                changed_attributes,
                ..
            } => plan.add(Effect::Update {
                id,
                from,
                to: resource,
                changed_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    for state in current.iter().rev() {
        if !state.exists || declared.contains(&state.id) {
            continue;
        }
        if let Some(effect) = delete_effect(state) {
            plan.add(effect);
        }
    }

    plan
}

/// Plan deleting every recorded resource, newest first
pub fn destroy_plan(current: &[State]) -> Plan {
    let mut plan = Plan::new();
    for state in current.iter().rev().filter(|s| s.exists) {
        if let Some(effect) = delete_effect(state) {
            plan.add(effect);
        }
    }
    plan
}

fn delete_effect(state: &State) -> Option<Effect> {
    match &state.identifier {
        Some(identifier) => Some(Effect::Delete {
            id: state.id.clone(),
            identifier: identifier.clone(),
        }),
        None => {
            log::warn!("{} has no recorded identifier, skipping delete", state.id);
            None
        }
    }
}
