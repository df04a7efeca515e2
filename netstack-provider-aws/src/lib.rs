//! Netstack AWS Provider
//!
//! Applies network stack resources through the AWS Cloud Control API and
//! answers the lookups needed before a stack is declared.

pub mod certificate;
pub mod lookup;
pub mod provider;
pub mod resources;
pub mod utils;

pub use provider::AwsProvider;

use netstack_core::provider::{BoxFuture, Lookup, Provider, ProviderResult};
use netstack_core::resource::{Resource, ResourceId, State};
use netstack_core::topology::VpcTopology;

impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.read_resource(&id, &identifier).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        to: &Resource,
        changed_attributes: &[String],
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let to = to.clone();
        let changed_attributes = changed_attributes.to_vec();
        Box::pin(async move {
            self.update_resource(&id, &identifier, &to, &changed_attributes)
                .await
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }
}

impl Lookup for AwsProvider {
    fn availability_zones(&self) -> BoxFuture<'_, ProviderResult<Vec<String>>> {
        Box::pin(async move { self.describe_availability_zones().await })
    }

    fn lookup_vpc(&self, vpc_id: &str) -> BoxFuture<'_, ProviderResult<VpcTopology>> {
        let vpc_id = vpc_id.to_string();
        Box::pin(async move { self.describe_vpc_topology(&vpc_id).await })
    }

    fn lookup_string_parameter(
        &self,
        name: &str,
    ) -> BoxFuture<'_, ProviderResult<Option<String>>> {
        let name = name.to_string();
        Box::pin(async move { self.read_string_parameter(&name).await })
    }
}

#[cfg(test)]
mod tests {
    use netstack_core::config::NetworkStackProps;
    use netstack_core::context::StackContext;
    use netstack_core::stack::{NetworkStack, types};

    use crate::resources::get_resource_config;

    fn full_stack(certificate_arn: Option<&str>) -> NetworkStack {
        let props = NetworkStackProps {
            alb_enabled: true,
            alb_acm_cert_arn: certificate_arn.map(str::to_string),
            elasticsearch_service_enabled: true,
            target_cluster_endpoint: Some("https://target.example.com:443".into()),
            ..NetworkStackProps::new("dev")
        };
        let context = StackContext::for_new_vpc(
            "us-east-1",
            vec!["us-east-1a".into(), "us-east-1b".into()],
        );
        NetworkStack::declare(&props, &context).unwrap()
    }

    #[test]
    fn every_declared_attribute_has_a_cloudformation_property() {
        let stack = full_stack(Some("arn:aws:acm:us-east-1:123456789012:certificate/abc"));
        assert!(!stack.resources.is_empty());

        for resource in &stack.resources {
            let config = get_resource_config(&resource.id.resource_type)
                .unwrap_or_else(|| panic!("{} has no configuration", resource.id));
            for key in resource.attributes.keys() {
                if key == "tags" {
                    assert!(config.tags_property.is_some(), "{} is not taggable", resource.id);
                    continue;
                }
                assert!(
                    config.writable().any(|(name, _, _)| *name == key.as_str()),
                    "{}.{} is not a writable property",
                    resource.id,
                    key
                );
            }
        }
    }

    #[test]
    fn only_the_imported_certificate_bypasses_cloud_control() {
        let stack = full_stack(None);
        let unmanaged: Vec<_> = stack
            .resources
            .iter()
            .filter(|r| get_resource_config(&r.id.resource_type).is_none())
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(unmanaged, vec![format!("{}.alb_certificate", types::IMPORTED_CERTIFICATE)]);
    }

    #[test]
    fn desired_state_of_parameters_is_plain_json() {
        let stack = full_stack(None);
        let parameter = stack
            .resources
            .iter()
            .find(|r| r.id.resource_type == types::SSM_PARAMETER)
            .unwrap();
        let config = get_resource_config(&parameter.id.resource_type).unwrap();
        let desired = crate::provider::desired_state(config, parameter);
        assert_eq!(desired["Type"], "String");
        assert!(desired["Name"].as_str().unwrap().starts_with("/migration/dev/default/"));
    }
}
