//! AWS Provider implementation
//!
//! Resource CRUD goes through the Cloud Control API; network lookups use
//! the EC2 API directly.

use std::collections::HashMap;
use std::time::Duration;

use aws_config::Region;
use aws_sdk_acm::Client as AcmClient;
use aws_sdk_cloudcontrol::Client as CloudControlClient;
use aws_sdk_cloudcontrol::types::OperationStatus;
use aws_sdk_ec2::Client as Ec2Client;
use netstack_core::provider::{ProviderError, ProviderResult};
use netstack_core::resource::{Resource, ResourceId, State, Value};
use netstack_core::stack::types;

use crate::resources::{ResourceConfig, get_resource_config};
use crate::utils::{build_tags, parse_tags, remove_property, set_property};

/// Attempts while waiting for a Cloud Control request
const MAX_STATUS_ATTEMPTS: u32 = 120;
/// Delay between status polls
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// AWS Provider
pub struct AwsProvider {
    pub(crate) cloudcontrol_client: CloudControlClient,
    pub(crate) ec2_client: Ec2Client,
    pub(crate) acm_client: AcmClient,
    region: String,
}

impl AwsProvider {
    /// Create a provider for `region`, or for the region of the default
    /// AWS configuration chain when none is given
    pub async fn new(region: Option<&str>) -> ProviderResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;

        let region = config
            .region()
            .map(|r| r.to_string())
            .ok_or_else(|| ProviderError::new("No AWS region configured"))?;

        Ok(Self {
            cloudcontrol_client: CloudControlClient::new(&config),
            ec2_client: Ec2Client::new(&config),
            acm_client: AcmClient::new(&config),
            region,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    // =========================================================================
    // Cloud Control API Methods
    // =========================================================================

    /// Get a resource's properties, or None if it does not exist
    pub async fn cc_get_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<Option<serde_json::Value>> {
        let result = self
            .cloudcontrol_client
            .get_resource()
            .type_name(type_name)
            .identifier(identifier)
            .send()
            .await;

        match result {
            Ok(response) => {
                let Some(props_str) = response.resource_description().and_then(|d| d.properties())
                else {
                    return Ok(None);
                };
                let props = serde_json::from_str(props_str).map_err(|e| {
                    ProviderError::new(format!("Invalid properties for {}", identifier))
                        .with_cause(e)
                })?;
                Ok(Some(props))
            }
            Err(e) => {
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception())
                {
                    Ok(None)
                } else {
                    Err(ProviderError::new(format!(
                        "Failed to get resource: {:?}",
                        e
                    )))
                }
            }
        }
    }

    /// Create a resource and return its identifier
    pub async fn cc_create_resource(
        &self,
        type_name: &str,
        desired_state: serde_json::Value,
    ) -> ProviderResult<String> {
        let result = self
            .cloudcontrol_client
            .create_resource()
            .type_name(type_name)
            .desired_state(desired_state.to_string())
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to create resource: {:?}", e)))?;

        let request_token = result
            .progress_event()
            .and_then(|p| p.request_token())
            .ok_or_else(|| ProviderError::new("No request token returned"))?;

        self.wait_for_operation(request_token).await
    }

    /// Apply JSON patch operations to a resource
    pub async fn cc_update_resource(
        &self,
        type_name: &str,
        identifier: &str,
        patch_ops: Vec<serde_json::Value>,
    ) -> ProviderResult<()> {
        if patch_ops.is_empty() {
            return Ok(());
        }

        let patch_document = serde_json::to_string(&patch_ops)
            .map_err(|e| ProviderError::new("Failed to build patch").with_cause(e))?;

        let result = self
            .cloudcontrol_client
            .update_resource()
            .type_name(type_name)
            .identifier(identifier)
            .patch_document(patch_document)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to update resource: {:?}", e)))?;

        if let Some(request_token) = result.progress_event().and_then(|p| p.request_token()) {
            self.wait_for_operation(request_token).await?;
        }

        Ok(())
    }

    pub async fn cc_delete_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<()> {
        let result = self
            .cloudcontrol_client
            .delete_resource()
            .type_name(type_name)
            .identifier(identifier)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to delete resource: {:?}", e)))?;

        if let Some(request_token) = result.progress_event().and_then(|p| p.request_token()) {
            self.wait_for_operation(request_token).await?;
        }

        Ok(())
    }

    /// Poll a Cloud Control request until it settles; returns the resource identifier
    async fn wait_for_operation(&self, request_token: &str) -> ProviderResult<String> {
        for _ in 0..MAX_STATUS_ATTEMPTS {
            let status = self
                .cloudcontrol_client
                .get_resource_request_status()
                .request_token(request_token)
                .send()
                .await
                .map_err(|e| {
                    ProviderError::new(format!("Failed to get operation status: {:?}", e))
                })?;

            match status.progress_event().and_then(|p| p.operation_status()) {
                Some(OperationStatus::Success) => {
                    let identifier = status
                        .progress_event()
                        .and_then(|p| p.identifier())
                        .unwrap_or_default();
                    return Ok(identifier.to_string());
                }
                Some(OperationStatus::Failed) => {
                    let msg = status
                        .progress_event()
                        .and_then(|p| p.status_message())
                        .unwrap_or("Unknown error");
                    return Err(ProviderError::new(format!("Operation failed: {}", msg)));
                }
                Some(OperationStatus::CancelComplete) => {
                    return Err(ProviderError::new("Operation was cancelled"));
                }
                _ => tokio::time::sleep(STATUS_POLL_INTERVAL).await,
            }
        }

        Err(ProviderError::new("Operation timed out"))
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn read_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        if id.resource_type == types::IMPORTED_CERTIFICATE {
            return self.read_certificate(id, identifier).await;
        }
        let config = config_for(id)?;

        match self.cc_get_resource(config.aws_type_name, identifier).await? {
            Some(props) => Ok(State::existing(id.clone(), attributes_from_props(config, &props))
                .with_identifier(identifier)),
            None => Ok(State::not_found(id.clone())),
        }
    }

    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        if resource.id.resource_type == types::IMPORTED_CERTIFICATE {
            return self.import_certificate(resource, None).await;
        }
        let config = config_for(&resource.id)?;
        let desired_state = desired_state(config, resource);

        log::debug!("Creating {} as {}", resource.id, config.aws_type_name);
        let identifier = self
            .cc_create_resource(config.aws_type_name, desired_state)
            .await
            .map_err(|e| e.for_resource(resource.id.clone()))?;

        self.read_resource(&resource.id, &identifier).await
    }

    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        to: &Resource,
        changed_attributes: &[String],
    ) -> ProviderResult<State> {
        if id.resource_type == types::IMPORTED_CERTIFICATE {
            return self.import_certificate(to, Some(identifier)).await;
        }
        let config = config_for(id)?;
        let patch_ops = patch_operations(config, to, changed_attributes);

        self.cc_update_resource(config.aws_type_name, identifier, patch_ops)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;

        self.read_resource(id, identifier).await
    }

    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        if id.resource_type == types::IMPORTED_CERTIFICATE {
            return self.delete_certificate(id, identifier).await;
        }
        let config = config_for(id)?;

        self.cc_delete_resource(config.aws_type_name, identifier)
            .await
            .map_err(|e| e.for_resource(id.clone()))
    }
}

fn config_for(id: &ResourceId) -> ProviderResult<&'static ResourceConfig> {
    get_resource_config(&id.resource_type).ok_or_else(|| {
        ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
            .for_resource(id.clone())
    })
}

/// Cloud Control desired state for a resource with resolved references
pub(crate) fn desired_state(config: &ResourceConfig, resource: &Resource) -> serde_json::Value {
    let mut desired = serde_json::Map::new();

    for (name, aws_name, _) in config.writable() {
        if let Some(value) = resource.attributes.get(*name) {
            desired.insert(aws_name.to_string(), value.to_json());
        }
    }

    if let Some(tags_property) = config.tags_property {
        let tags = build_tags(resource.attributes.get("tags"));
        if !tags.is_empty() {
            desired.insert(tags_property.to_string(), serde_json::Value::Array(tags));
        }
    }

    serde_json::Value::Object(desired)
}

/// Patch setting changed attributes to their new values and removing dropped ones
pub(crate) fn patch_operations(
    config: &ResourceConfig,
    to: &Resource,
    changed_attributes: &[String],
) -> Vec<serde_json::Value> {
    let mut patch_ops = Vec::new();

    for attribute in changed_attributes {
        let property = if attribute == "tags" {
            config.tags_property
        } else {
            config.aws_name(attribute)
        };
        let Some(property) = property else {
            log::warn!("{} has no updatable property {}", to.id, attribute);
            continue;
        };

        match to.attributes.get(attribute.as_str()) {
            Some(value) if attribute == "tags" => {
                patch_ops.push(set_property(property, build_tags(Some(value)).into()));
            }
            Some(value) => patch_ops.push(set_property(property, value.to_json())),
            None => patch_ops.push(remove_property(property)),
        }
    }

    patch_ops
}

/// Stack attributes from Cloud Control properties
pub(crate) fn attributes_from_props(
    config: &ResourceConfig,
    props: &serde_json::Value,
) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();

    for (name, aws_name, _) in config.attributes {
        if let Some(value) = props.get(*aws_name).and_then(Value::from_json) {
            attributes.insert(name.to_string(), value);
        }
    }

    if let Some(tags_property) = config.tags_property
        && let Some(tags) = props.get(tags_property).and_then(|v| v.as_array())
    {
        let tags = parse_tags(tags);
        if !tags.is_empty() {
            attributes.insert("tags".to_string(), Value::Map(tags));
        }
    }

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{HOSTED_ZONE_CONFIG, LOAD_BALANCER_CONFIG, SSM_PARAMETER_CONFIG, VPC_CONFIG};
    use serde_json::json;

    #[test]
    fn desired_state_maps_attributes_and_tags() {
        let resource = Resource::new("ec2_vpc", "domain_vpc")
            .with_attribute("cidr_block", "10.0.0.0/16")
            .with_attribute("enable_dns_support", true)
            .with_attribute("vpc_id", "ignored-output")
            .with_attribute("tags", Value::map([("Name", Value::string("vpc"))]));

        assert_eq!(
            desired_state(&VPC_CONFIG, &resource),
            json!({
                "CidrBlock": "10.0.0.0/16",
                "EnableDnsSupport": true,
                "Tags": [{"Key": "Name", "Value": "vpc"}]
            })
        );
    }

    #[test]
    fn hosted_zone_tags_use_type_specific_property() {
        let resource = Resource::new("route53_hosted_zone", "alb_hosted_zone")
            .with_attribute("name", "alb.migration.dev.local")
            .with_attribute("tags", Value::map([("Stage", Value::string("dev"))]));

        let desired = desired_state(&HOSTED_ZONE_CONFIG, &resource);
        assert_eq!(
            desired["HostedZoneTags"],
            json!([{"Key": "Stage", "Value": "dev"}])
        );
        assert!(desired.get("Tags").is_none());
    }

    #[test]
    fn nested_maps_keep_cloudformation_keys() {
        let resource = Resource::new("elbv2_load_balancer", "alb").with_attribute(
            "load_balancer_attributes",
            Value::List(vec![Value::map([
                ("Key", Value::string("routing.http2.enabled")),
                ("Value", Value::string("false")),
            ])]),
        );
        assert_eq!(
            desired_state(&LOAD_BALANCER_CONFIG, &resource)["LoadBalancerAttributes"],
            json!([{"Key": "routing.http2.enabled", "Value": "false"}])
        );
    }

    #[test]
    fn patch_sets_changed_and_removes_dropped_attributes() {
        let to = Resource::new("ec2_vpc", "domain_vpc")
            .with_attribute("enable_dns_hostnames", true)
            .with_attribute("tags", Value::map([("Name", Value::string("vpc"))]));
        let changed = vec![
            "enable_dns_hostnames".to_string(),
            "enable_dns_support".to_string(),
            "tags".to_string(),
            "vpc_id".to_string(),
        ];

        assert_eq!(
            patch_operations(&VPC_CONFIG, &to, &changed),
            vec![
                json!({"op": "add", "path": "/EnableDnsHostnames", "value": true}),
                json!({"op": "remove", "path": "/EnableDnsSupport"}),
                json!({"op": "add", "path": "/Tags", "value": [{"Key": "Name", "Value": "vpc"}]}),
            ]
        );
    }

    #[test]
    fn attributes_include_read_only_outputs() {
        let props = json!({
            "VpcId": "vpc-123",
            "CidrBlock": "10.0.0.0/16",
            "Tags": [{"Key": "Name", "Value": "vpc"}],
            "Ipv6CidrBlocks": []
        });
        let attributes = attributes_from_props(&VPC_CONFIG, &props);

        assert_eq!(attributes["vpc_id"], Value::string("vpc-123"));
        assert_eq!(attributes["cidr_block"], Value::string("10.0.0.0/16"));
        assert_eq!(
            attributes["tags"],
            Value::map([("Name", Value::string("vpc"))])
        );
        assert_eq!(attributes.len(), 3);
    }

    #[test]
    fn ssm_parameter_value_is_read_back() {
        let props = json!({"Name": "/migration/dev/default/vpcId", "Type": "String", "Value": "vpc-1"});
        let attributes = attributes_from_props(&SSM_PARAMETER_CONFIG, &props);
        assert_eq!(attributes["value"], Value::string("vpc-1"));
    }
}
