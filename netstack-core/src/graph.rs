//! Graph - Ordering and reference resolution between declared resources

use std::collections::{HashMap, HashSet};

use crate::resource::{Resource, State, Value};

/// Known states by logical name
pub type StateMap = HashMap<String, State>;

/// Sort resources so that every resource comes after the ones it references.
///
/// Depth-first, visiting resources in declaration order; a cycle is cut at the
/// edge that closes it, leaving declaration order to decide.
pub fn sort_by_dependencies(resources: &[Resource]) -> Vec<Resource> {
    let by_name: HashMap<&str, &Resource> = resources.iter().map(|r| (r.name(), r)).collect();

    let mut sorted = Vec::with_capacity(resources.len());
    let mut visited: HashSet<&str> = HashSet::new();
    let mut visiting: HashSet<&str> = HashSet::new();

    fn visit<'a>(
        resource: &'a Resource,
        by_name: &HashMap<&str, &'a Resource>,
        visited: &mut HashSet<&'a str>,
        visiting: &mut HashSet<&'a str>,
        sorted: &mut Vec<Resource>,
    ) {
        let name = resource.name();
        if visited.contains(name) {
            return;
        }
        if visiting.contains(name) {
            log::warn!("Circular dependency through {}", resource.id);
            return;
        }

        visiting.insert(name);
        for dep in resource.dependencies() {
            if let Some(dep_resource) = by_name.get(dep.as_str()) {
                visit(dep_resource, by_name, visited, visiting, sorted);
            }
        }
        visiting.remove(name);
        visited.insert(name);
        sorted.push(resource.clone());
    }

    for resource in resources {
        visit(resource, &by_name, &mut visited, &mut visiting, &mut sorted);
    }

    sorted
}

/// Substitute references with attribute values of known states.
/// References that cannot be resolved yet are kept as-is.
pub fn resolve_value(value: &Value, known: &StateMap) -> Value {
    match value {
        Value::ResourceRef(name, attribute) => known
            .get(name)
            .filter(|state| state.exists)
            .and_then(|state| state.attributes.get(attribute))
            .map(|resolved| resolve_value(resolved, known))
            .unwrap_or_else(|| value.clone()),
        Value::List(items) => Value::List(items.iter().map(|v| resolve_value(v, known)).collect()),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, known)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Copy of `resource` with every resolvable reference substituted
pub fn resolve_resource(resource: &Resource, known: &StateMap) -> Resource {
    let mut resolved = resource.clone();
    resolved.attributes = resource
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), resolve_value(v, known)))
        .collect();
    resolved
}
