//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. This is where side effects actually occur.

use crate::effect::Effect;
use crate::graph::{StateMap, resolve_resource};
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resource::{Resource, State};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Delete succeeded
    Deleted,
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

/// Result of executing the entire Plan
///
/// `outcomes[i]` belongs to the i-th effect of the plan. Execution stops at
/// the first failure unless `continue_on_error` is set.
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute a Plan, interpreting all Effects and causing side effects.
    ///
    /// `known` holds the states references are resolved from; it is updated
    /// as resources are created, updated, and deleted.
    pub async fn apply(&self, plan: &Plan, known: &mut StateMap) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            log::info!("{}", effect);
            let result = self.execute_effect(effect, known).await;

            match &result {
                Ok(_) => success_count += 1,
                Err(e) => {
                    log::error!("{} failed: {}", effect.id(), e);
                    failure_count += 1;
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    async fn execute_effect(
        &self,
        effect: &Effect,
        known: &mut StateMap,
    ) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Create(resource) => {
                let resolved = resolve_for_apply(resource, known)?;
                let state = self.provider.create(&resolved).await?;
                let state = record(state, &resolved);
                known.insert(resource.name().to_string(), state.clone());
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            } => {
                let identifier = from.identifier.as_deref().ok_or_else(|| {
                    ProviderError::new("No identifier recorded for update").for_resource(id.clone())
                })?;
                let resolved = resolve_for_apply(to, known)?;
                let state = self
                    .provider
                    .update(id, identifier, &resolved, changed_attributes)
                    .await?;
                let mut state = record(state, &resolved);
                if state.identifier.is_none() {
                    state.identifier = Some(identifier.to_string());
                }
                known.insert(id.name.clone(), state.clone());
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Delete { id, identifier } => {
                self.provider.delete(id, identifier).await?;
                // A replacement of another type may already hold the name
                if known.get(&id.name).is_some_and(|s| s.id == *id) {
                    known.remove(&id.name);
                }
                Ok(EffectOutcome::Deleted)
            }
        }
    }
}

/// Resolve references, failing if any remain
fn resolve_for_apply(resource: &Resource, known: &StateMap) -> ProviderResult<Resource> {
    let resolved = resolve_resource(resource, known);
    let unresolved: Vec<&str> = resolved
        .attributes
        .iter()
        .filter(|(_, v)| v.has_unresolved_refs())
        .map(|(k, _)| k.as_str())
        .collect();
    if unresolved.is_empty() {
        Ok(resolved)
    } else {
        Err(ProviderError::new(format!(
            "Unresolved references in attributes: {}",
            unresolved.join(", ")
        ))
        .for_resource(resource.id.clone()))
    }
}

/// Recorded attributes are the applied values plus the outputs the provider reported
fn record(mut state: State, applied: &Resource) -> State {
    for (key, value) in &applied.attributes {
        state.attributes.insert(key.clone(), value.clone());
    }
    state.exists = true;
    state
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::provider::BoxFuture;
    use crate::resource::{ResourceId, Value};

    /// Records calls and reports `{name}_id` outputs
    #[derive(Default)]
    struct TestProvider {
        calls: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl TestProvider {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Provider for TestProvider {
        fn name(&self) -> &'static str {
            "test"
        }

        fn read(&self, id: &ResourceId, _identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("create {}", resource.name()));
            if self.fail_on.as_deref() == Some(resource.name()) {
                let id = resource.id.clone();
                return Box::pin(async move { Err(ProviderError::new("boom").for_resource(id)) });
            }
            let output = format!("{}_id", resource.id.resource_type);
            let mut attributes = HashMap::new();
            attributes.insert(output, Value::string(format!("cloud-{}", resource.name())));
            let state = State::existing(resource.id.clone(), attributes)
                .with_identifier(format!("cloud-{}", resource.name()));
            Box::pin(async move { Ok(state) })
        }

        fn update(
            &self,
            id: &ResourceId,
            identifier: &str,
            to: &Resource,
            changed_attributes: &[String],
        ) -> BoxFuture<'_, ProviderResult<State>> {
            self.calls.lock().unwrap().push(format!(
                "update {} {} [{}]",
                id.name,
                identifier,
                changed_attributes.join(",")
            ));
            let state = State::existing(id.clone(), to.attributes.clone());
            Box::pin(async move { Ok(state) })
        }

        fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete {} {}", id.name, identifier));
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn apply_empty_plan() {
        let interpreter = Interpreter::new(TestProvider::default());
        let result = interpreter.apply(&Plan::new(), &mut StateMap::new()).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 0);
    }

    #[tokio::test]
    async fn create_resolves_references_from_earlier_effects() {
        let interpreter = Interpreter::new(TestProvider::default());
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("vpc", "domain_vpc")));
        plan.add(Effect::Create(
            Resource::new("subnet", "private_subnet_1")
                .with_attribute("vpc_id", Value::reference("domain_vpc", "vpc_id")),
        ));

        let mut known = StateMap::new();
        let result = interpreter.apply(&plan, &mut known).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 2);
        let subnet = &known["private_subnet_1"];
        assert_eq!(subnet.attributes["vpc_id"], Value::string("cloud-domain_vpc"));
        assert_eq!(subnet.identifier.as_deref(), Some("cloud-private_subnet_1"));
    }

    #[tokio::test]
    async fn unresolved_reference_fails_without_calling_provider() {
        let provider = TestProvider::default();
        let interpreter = Interpreter::new(provider);
        let mut plan = Plan::new();
        plan.add(Effect::Create(
            Resource::new("subnet", "s").with_attribute("vpc_id", Value::reference("missing", "vpc_id")),
        ));

        let result = interpreter.apply(&plan, &mut StateMap::new()).await;
        assert_eq!(result.failure_count, 1);
        assert!(interpreter.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn stops_at_first_failure_unless_configured() {
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("t", "a")));
        plan.add(Effect::Create(Resource::new("t", "b")));
        plan.add(Effect::Create(Resource::new("t", "c")));

        let failing = || TestProvider {
            fail_on: Some("b".to_string()),
            ..Default::default()
        };

        let result = Interpreter::new(failing())
            .apply(&plan, &mut StateMap::new())
            .await;
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 1);

        let config = InterpreterConfig {
            continue_on_error: true,
            ..Default::default()
        };
        let result = Interpreter::new(failing())
            .with_config(config)
            .apply(&plan, &mut StateMap::new())
            .await;
        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.success_count, 2);
    }

    #[tokio::test]
    async fn update_and_delete_use_recorded_identifier() {
        let interpreter = Interpreter::new(TestProvider::default());
        let id = ResourceId::new("ssm_parameter", "p");
        let from = State::existing(id.clone(), HashMap::new()).with_identifier("/migration/dev/default/p");

        let mut known = StateMap::new();
        known.insert("p".to_string(), from.clone());

        let mut plan = Plan::new();
        plan.add(Effect::Update {
            id: id.clone(),
            from,
            to: Resource::new("ssm_parameter", "p").with_attribute("value", "v2"),
            changed_attributes: vec!["value".to_string()],
        });
        plan.add(Effect::Delete {
            id: ResourceId::new("ssm_parameter", "old"),
            identifier: "/migration/dev/default/old".to_string(),
        });

        let result = interpreter.apply(&plan, &mut known).await;
        assert!(result.is_success());
        assert_eq!(
            interpreter.provider.calls(),
            vec![
                "update p /migration/dev/default/p [value]".to_string(),
                "delete old /migration/dev/default/old".to_string(),
            ]
        );
        assert_eq!(
            known["p"].identifier.as_deref(),
            Some("/migration/dev/default/p")
        );
        assert_eq!(known["p"].attributes["value"], Value::string("v2"));
    }

    #[tokio::test]
    async fn dry_run_skips_effects() {
        let config = InterpreterConfig {
            dry_run: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(TestProvider::default()).with_config(config);
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("t", "example")));

        let result = interpreter.apply(&plan, &mut StateMap::new()).await;

        assert!(result.is_success());
        assert!(matches!(
            result.outcomes[0],
            Ok(EffectOutcome::Skipped { .. })
        ));
        assert!(interpreter.provider.calls().is_empty());
    }
}
