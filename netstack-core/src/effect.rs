//! Effect - A single change to infrastructure, held as a value
//!
//! Effects are produced by the differ and executed by the interpreter.
//! Creating one has no side effect.

use std::fmt;

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Provision a resource that does not exist yet
    Create(Resource),
    /// Change attributes of an existing resource in place
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Remove a resource that is no longer declared
    Delete { id: ResourceId, identifier: String },
}

impl Effect {
    pub fn id(&self) -> &ResourceId {
        match self {
            Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } => id,
            Effect::Delete { id, .. } => id,
        }
    }

    /// Marker used when printing plans
    pub fn symbol(&self) -> &'static str {
        match self {
            Effect::Create(_) => "+",
            Effect::Update { .. } => "~",
            Effect::Delete { .. } => "-",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Update {
                id,
                changed_attributes,
                ..
            } => write!(
                f,
                "{} {} ({})",
                self.symbol(),
                id,
                changed_attributes.join(", ")
            ),
            _ => write!(f, "{} {}", self.symbol(), self.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_marks_effect_kind() {
        let create = Effect::Create(Resource::new("ec2_vpc", "domain_vpc"));
        assert_eq!(create.to_string(), "+ ec2_vpc.domain_vpc");

        let id = ResourceId::new("ssm_parameter", "SSMParameterVpcId");
        let update = Effect::Update {
            id: id.clone(),
            from: State::not_found(id.clone()),
            to: Resource::new("ssm_parameter", "SSMParameterVpcId"),
            changed_attributes: vec!["value".to_string()],
        };
        assert_eq!(update.to_string(), "~ ssm_parameter.SSMParameterVpcId (value)");

        let delete = Effect::Delete {
            id,
            identifier: "/migration/dev/default/vpcId".to_string(),
        };
        assert_eq!(delete.to_string(), "- ssm_parameter.SSMParameterVpcId");
    }
}
