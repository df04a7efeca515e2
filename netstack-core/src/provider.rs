//! Provider - Traits abstracting cloud operations
//!
//! A [`Provider`] turns Effects into API calls against real infrastructure.
//! A [`Lookup`] answers the read-only questions the declaration pass needs
//! answered up front (available zones, existing networks, published parameters).

use std::future::Future;
use std::pin::Pin;

use crate::resource::{Resource, ResourceId, State};
use crate::topology::VpcTopology;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resource operations against a cloud
///
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    /// Get the current state of a resource by its cloud identifier.
    /// Returns `State::not_found()` if the resource does not exist.
    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource whose references are already resolved.
    /// The returned State carries the cloud identifier.
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update the given attributes of an existing resource in place
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        to: &Resource,
        changed_attributes: &[String],
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource by its cloud identifier
    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;
}

impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        to: &Resource,
        changed_attributes: &[String],
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, to, changed_attributes)
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, identifier)
    }
}

/// Read-only queries answered before a stack is declared
pub trait Lookup: Send + Sync {
    /// Names of the available zones in the provider's region, sorted
    fn availability_zones(&self) -> BoxFuture<'_, ProviderResult<Vec<String>>>;

    /// Subnet layout of an existing VPC
    fn lookup_vpc(&self, vpc_id: &str) -> BoxFuture<'_, ProviderResult<VpcTopology>>;

    /// Value of a string parameter, or None if it does not exist
    fn lookup_string_parameter(&self, name: &str)
    -> BoxFuture<'_, ProviderResult<Option<String>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn read(&self, id: &ResourceId, _identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs).with_identifier("mock-id-123")) })
        }

        fn update(
            &self,
            id: &ResourceId,
            identifier: &str,
            to: &Resource,
            _changed_attributes: &[String],
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let state = State::existing(id.clone(), to.attributes.clone()).with_identifier(identifier);
            Box::pin(async move { Ok(state) })
        }

        fn delete(&self, _id: &ResourceId, _identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn boxed_provider_delegates() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        assert_eq!(provider.name(), "mock");

        let state = provider
            .create(&Resource::new("ec2_vpc", "domain_vpc"))
            .await
            .unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("mock-id-123"));

        let id = ResourceId::new("ec2_vpc", "domain_vpc");
        let state = provider.read(&id, "vpc-1").await.unwrap();
        assert!(!state.exists);
    }

    #[test]
    fn error_display_includes_resource() {
        let err = ProviderError::new("boom").for_resource(ResourceId::new("ec2_vpc", "domain_vpc"));
        assert_eq!(err.to_string(), "[ec2_vpc.domain_vpc] boom");
        assert_eq!(ProviderError::new("plain").to_string(), "plain");
    }
}
