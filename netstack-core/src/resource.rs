//! Resource - Declared resources and their observed state

use std::collections::{BTreeSet, HashMap};

/// Unique identifier for a resource within a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Resource type (e.g., "ec2_vpc", "elbv2_listener")
    pub resource_type: String,
    /// Logical name, unique within the stack (e.g., "domain_vpc")
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Reference to another resource's attribute (logical name, attribute name).
    /// Resolved once the referenced resource exists.
    ResourceRef(String, String),
}

impl Value {
    /// Shorthand for a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Shorthand for a reference to `name.attribute`
    pub fn reference(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::ResourceRef(name.into(), attribute.into())
    }

    /// Build a map value from key/value pairs
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// True if this value (or anything nested in it) is still an unresolved reference
    pub fn has_unresolved_refs(&self) -> bool {
        match self {
            Value::ResourceRef(_, _) => true,
            Value::List(items) => items.iter().any(Value::has_unresolved_refs),
            Value::Map(map) => map.values().any(Value::has_unresolved_refs),
            _ => false,
        }
    }

    /// Collect the logical names this value references
    pub fn collect_references(&self, refs: &mut BTreeSet<String>) {
        match self {
            Value::ResourceRef(name, _) => {
                refs.insert(name.clone());
            }
            Value::List(items) => {
                for item in items {
                    item.collect_references(refs);
                }
            }
            Value::Map(map) => {
                for v in map.values() {
                    v.collect_references(refs);
                }
            }
            _ => {}
        }
    }

    /// Convert to JSON. References render as `${name.attribute}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::ResourceRef(name, attr) => {
                serde_json::Value::String(format!("${{{}.{}}}", name, attr))
            }
        }
    }

    /// Convert from JSON. Null and non-integer numbers have no counterpart and yield None.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(Value::Int),
            serde_json::Value::Array(items) => Some(Value::List(
                items.iter().filter_map(Value::from_json).collect(),
            )),
            serde_json::Value::Object(map) => Some(Value::Map(
                map.iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
            serde_json::Value::Null => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Desired state of a resource, as declared by the stack
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
    /// Ordering-only dependencies that no attribute expresses
    pub depends_on: BTreeSet<String>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.insert(name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Logical name of the resource
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Logical names of the resources this one references
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps = self.depends_on.clone();
        for value in self.attributes.values() {
            value.collect_references(&mut deps);
        }
        deps.remove(&self.id.name);
        deps
    }

    /// Reference to one of this resource's attributes
    pub fn attr(&self, attribute: &str) -> Value {
        Value::reference(self.id.name.clone(), attribute)
    }
}

/// Current state fetched from actual infrastructure
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Cloud identifier (e.g., vpc-xxx, a load balancer ARN)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_follow_nested_references() {
        let resource = Resource::new("elbv2_listener", "listener")
            .with_attribute("load_balancer_arn", Value::reference("alb", "load_balancer_arn"))
            .with_attribute(
                "default_actions",
                Value::List(vec![Value::map([(
                    "TargetGroupArn",
                    Value::reference("tg", "target_group_arn"),
                )])]),
            );

        let deps: Vec<_> = resource.dependencies().into_iter().collect();
        assert_eq!(deps, vec!["alb".to_string(), "tg".to_string()]);
    }

    #[test]
    fn explicit_dependencies_are_included() {
        let resource = Resource::new("ec2_eip", "nat_eip_1").with_dependency("igw_attachment");
        assert!(resource.dependencies().contains("igw_attachment"));
    }

    #[test]
    fn self_reference_is_not_a_dependency() {
        let resource = Resource::new("ec2_security_group_ingress", "sg")
            .with_attribute("source_security_group_id", Value::reference("sg", "group_id"));
        assert!(resource.dependencies().is_empty());
    }

    #[test]
    fn unresolved_refs_are_detected_in_lists() {
        let value = Value::List(vec![Value::string("subnet-1"), Value::reference("s", "subnet_id")]);
        assert!(value.has_unresolved_refs());
        assert!(!Value::string("subnet-1").has_unresolved_refs());
    }

    #[test]
    fn json_conversion_renders_references() {
        let value = Value::reference("domain_vpc", "vpc_id");
        assert_eq!(value.to_json(), serde_json::json!("${domain_vpc.vpc_id}"));
        assert_eq!(
            Value::from_json(&serde_json::json!({"Port": 9200})),
            Some(Value::map([("Port", Value::Int(9200))]))
        );
        assert_eq!(Value::from_json(&serde_json::Value::Null), None);
    }
}
