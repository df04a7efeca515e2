//! State file structures for persisting applied resources

use std::collections::BTreeMap;

use netstack_core::interpreter::{ApplyResult, EffectOutcome};
use netstack_core::plan::Plan;
use netstack_core::resource::{ResourceId, State, Value};
use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, BackendResult};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Stage the resources were applied for
    pub stage: String,
    /// Applied resources, in creation order
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new empty state file for a stage
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            stage: stage.into(),
            resources: Vec::new(),
        }
    }

    pub fn increment_serial(&mut self) {
        self.serial += 1;
    }

    /// Fail unless this state belongs to `stage`
    pub fn ensure_stage(&self, stage: &str) -> BackendResult<()> {
        if self.stage != stage {
            return Err(BackendError::StageMismatch {
                expected: stage.to_string(),
                actual: self.stage.clone(),
            });
        }
        Ok(())
    }

    /// Find a resource by type and logical name
    pub fn find_resource(&self, resource_type: &str, name: &str) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    /// Replace a recorded resource in place, or append it.
    ///
    /// Records are keyed by type and name: a replacement of another type is
    /// appended next to the record it replaces until that one is deleted.
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        if let Some(existing) = self
            .resources
            .iter_mut()
            .find(|r| r.resource_type == resource.resource_type && r.name == resource.name)
        {
            *existing = resource;
        } else {
            self.resources.push(resource);
        }
    }

    /// Remove a resource from the state
    pub fn remove_resource(&mut self, resource_type: &str, name: &str) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == resource_type && r.name == name)?;
        Some(self.resources.remove(pos))
    }

    /// Keep only the records that have a counterpart in `states`
    pub fn retain_states(&mut self, states: &[State]) {
        self.resources.retain(|r| {
            states
                .iter()
                .any(|s| s.id.resource_type == r.resource_type && s.id.name == r.name)
        });
    }

    /// Recorded resources as provider states, in creation order
    pub fn to_states(&self) -> Vec<State> {
        self.resources.iter().map(ResourceState::to_state).collect()
    }

    /// Record the outcome of every effect that succeeded.
    ///
    /// Failed and skipped effects leave the state untouched, so the next plan
    /// retries them.
    pub fn record_apply(&mut self, plan: &Plan, result: &ApplyResult) {
        for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
            match outcome {
                Ok(EffectOutcome::Created { state }) | Ok(EffectOutcome::Updated { state }) => {
                    self.upsert_resource(ResourceState::from_state(state));
                }
                Ok(EffectOutcome::Deleted) => {
                    let id = effect.id();
                    self.remove_resource(&id.resource_type, &id.name);
                }
                Ok(EffectOutcome::Skipped { .. }) | Err(_) => {}
            }
        }
    }
}

/// State of a single applied resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "ec2_vpc", "elbv2_listener")
    pub resource_type: String,
    /// Logical name, unique within the stack
    pub name: String,
    /// Cloud identifier (VPC id, ARN, parameter name, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Applied attributes plus provider outputs
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            identifier: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn from_state(state: &State) -> Self {
        let mut resource = match &state.identifier {
            Some(identifier) => {
                Self::new(&state.id.resource_type, &state.id.name).with_identifier(identifier)
            }
            None => Self::new(&state.id.resource_type, &state.id.name),
        };
        resource.attributes = state
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        resource
    }

    pub fn to_state(&self) -> State {
        let attributes = self
            .attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        let state = State::existing(ResourceId::new(&self.resource_type, &self.name), attributes);
        match &self.identifier {
            Some(identifier) => state.with_identifier(identifier),
            None => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use netstack_core::effect::Effect;
    use netstack_core::provider::ProviderError;
    use netstack_core::resource::Resource;
    use serde_json::json;

    use super::*;

    fn applied(resource_type: &str, name: &str, identifier: &str) -> State {
        let mut attributes = HashMap::new();
        attributes.insert("cidr_block".to_string(), Value::string("10.0.0.0/16"));
        State::existing(ResourceId::new(resource_type, name), attributes).with_identifier(identifier)
    }

    #[test]
    fn new_state_is_empty() {
        let state = StateFile::new("dev");
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert_eq!(state.stage, "dev");
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn stage_must_match() {
        let state = StateFile::new("dev");
        assert!(state.ensure_stage("dev").is_ok());
        assert!(matches!(
            state.ensure_stage("prod"),
            Err(BackendError::StageMismatch { .. })
        ));
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut state = StateFile::new("dev");
        state.upsert_resource(ResourceState::new("ec2_vpc", "domain_vpc"));
        state.upsert_resource(ResourceState::new("ec2_subnet", "private_subnet_1"));
        state.upsert_resource(
            ResourceState::new("ec2_vpc", "domain_vpc").with_identifier("vpc-123"),
        );

        assert_eq!(state.resources.len(), 2);
        assert_eq!(state.resources[0].identifier.as_deref(), Some("vpc-123"));
        assert!(state.remove_resource("ec2_subnet", "domain_vpc").is_none());
        assert!(state.remove_resource("ec2_vpc", "domain_vpc").is_some());
        assert!(state.remove_resource("ec2_vpc", "domain_vpc").is_none());
    }

    #[test]
    fn states_survive_serialization() {
        let mut resource = ResourceState::from_state(&applied("ec2_vpc", "domain_vpc", "vpc-123"));
        resource
            .attributes
            .insert("enable_dns_support".to_string(), json!(true));
        let mut state = StateFile::new("dev");
        state.upsert_resource(resource);

        let json = serde_json::to_string_pretty(&state).unwrap();
        let read: StateFile = serde_json::from_str(&json).unwrap();
        assert_eq!(read.lineage, state.lineage);

        let states = read.to_states();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].identifier.as_deref(), Some("vpc-123"));
        assert_eq!(states[0].attributes["cidr_block"], Value::string("10.0.0.0/16"));
        assert_eq!(states[0].attributes["enable_dns_support"], Value::Bool(true));
        assert!(states[0].exists);
    }

    #[test]
    fn retain_states_drops_vanished_records() {
        let mut state = StateFile::new("dev");
        state.upsert_resource(ResourceState::new("ec2_vpc", "domain_vpc").with_identifier("vpc-1"));
        state.upsert_resource(ResourceState::new("ec2_subnet", "private_subnet_1").with_identifier("subnet-1"));
        state.upsert_resource(ResourceState::new("ec2_route", "route").with_identifier("r-1"));

        let refreshed = vec![
            applied("ec2_vpc", "domain_vpc", "vpc-1"),
            applied("ec2_subnet", "route", "subnet-9"),
        ];
        state.retain_states(&refreshed);

        let names: Vec<_> = state.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["domain_vpc"]);
    }

    #[test]
    fn record_apply_keeps_creation_order_and_skips_failures() {
        let mut state = StateFile::new("dev");
        state.upsert_resource(ResourceState::new("ssm_parameter", "old_parameter").with_identifier("/old"));
        state.upsert_resource(ResourceState::new("ec2_vpc", "domain_vpc").with_identifier("vpc-1"));

        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("ec2_subnet", "private_subnet_1")));
        plan.add(Effect::Update {
            id: ResourceId::new("ec2_vpc", "domain_vpc"),
            from: applied("ec2_vpc", "domain_vpc", "vpc-1"),
            to: Resource::new("ec2_vpc", "domain_vpc"),
            changed_attributes: vec!["cidr_block".to_string()],
        });
        plan.add(Effect::Create(Resource::new("ec2_subnet", "private_subnet_2")));
        plan.add(Effect::Delete {
            id: ResourceId::new("ssm_parameter", "old_parameter"),
            identifier: "/old".to_string(),
        });

        let result = ApplyResult {
            outcomes: vec![
                Ok(EffectOutcome::Created {
                    state: applied("ec2_subnet", "private_subnet_1", "subnet-1"),
                }),
                Ok(EffectOutcome::Updated {
                    state: applied("ec2_vpc", "domain_vpc", "vpc-1"),
                }),
                Err(ProviderError::new("boom")),
                Ok(EffectOutcome::Deleted),
            ],
            success_count: 3,
            failure_count: 1,
        };

        state.record_apply(&plan, &result);

        let names: Vec<_> = state.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["domain_vpc", "private_subnet_1"]);
        assert_eq!(
            state.find_resource("ec2_vpc", "domain_vpc").unwrap().attributes["cidr_block"],
            json!("10.0.0.0/16")
        );
    }

    #[test]
    fn replacement_moves_resource_to_end() {
        let mut state = StateFile::new("dev");
        state.upsert_resource(ResourceState::new("ec2_route", "route").with_identifier("r-1"));
        state.upsert_resource(ResourceState::new("ec2_vpc", "domain_vpc").with_identifier("vpc-1"));

        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("ec2_subnet", "route")));
        plan.add(Effect::Delete {
            id: ResourceId::new("ec2_route", "route"),
            identifier: "r-1".to_string(),
        });
        let result = ApplyResult {
            outcomes: vec![
                Ok(EffectOutcome::Created {
                    state: applied("ec2_subnet", "route", "subnet-9"),
                }),
                Ok(EffectOutcome::Deleted),
            ],
            success_count: 2,
            failure_count: 0,
        };

        state.record_apply(&plan, &result);

        assert_eq!(state.resources.len(), 2);
        assert_eq!(state.resources[1].resource_type, "ec2_subnet");
        assert_eq!(state.resources[1].identifier.as_deref(), Some("subnet-9"));
    }

    fn route_replaced_by_subnet() -> (StateFile, Plan) {
        let mut state = StateFile::new("dev");
        state.upsert_resource(ResourceState::new("ec2_route", "route").with_identifier("r-1"));

        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("ec2_subnet", "route")));
        plan.add(Effect::Delete {
            id: ResourceId::new("ec2_route", "route"),
            identifier: "r-1".to_string(),
        });
        (state, plan)
    }

    #[test]
    fn failed_replacement_delete_keeps_old_record() {
        let (mut state, plan) = route_replaced_by_subnet();
        let result = ApplyResult {
            outcomes: vec![
                Ok(EffectOutcome::Created {
                    state: applied("ec2_subnet", "route", "subnet-9"),
                }),
                Err(ProviderError::new("DependencyViolation")),
            ],
            success_count: 1,
            failure_count: 1,
        };

        state.record_apply(&plan, &result);

        let recorded: Vec<_> = state
            .resources
            .iter()
            .map(|r| (r.resource_type.as_str(), r.identifier.as_deref()))
            .collect();
        assert_eq!(
            recorded,
            vec![("ec2_route", Some("r-1")), ("ec2_subnet", Some("subnet-9"))]
        );

        // The next plan retries the delete from the surviving record
        let retry = netstack_core::differ::create_plan(
            &[Resource::new("ec2_subnet", "route").with_attribute("cidr_block", "10.0.0.0/16")],
            &state.to_states(),
        );
        assert_eq!(retry.len(), 1);
        assert!(matches!(
            &retry.effects()[0],
            Effect::Delete { id, identifier } if id.resource_type == "ec2_route" && identifier == "r-1"
        ));
    }

    #[test]
    fn replacement_stops_before_delete_keeps_old_record() {
        let (mut state, plan) = route_replaced_by_subnet();
        let result = ApplyResult {
            outcomes: vec![Err(ProviderError::new("boom"))],
            success_count: 0,
            failure_count: 1,
        };

        state.record_apply(&plan, &result);

        assert_eq!(state.resources.len(), 1);
        assert_eq!(
            state.find_resource("ec2_route", "route").unwrap().identifier.as_deref(),
            Some("r-1")
        );
    }
}
