//! Stack - Declaration of the migration network stack
//!
//! `NetworkStack::declare` turns validated props and a resolved
//! [`StackContext`] into the list of resources to provision and the SSM
//! parameters to publish. It performs no I/O.

pub mod alb;
pub mod types;
pub mod vpc;

use std::collections::HashSet;

use crate::config::NetworkStackProps;
use crate::context::StackContext;
use crate::endpoint::normalize_endpoint;
use crate::error::{StackError, StackResult};
use crate::parameter::{MigrationParameter, parameter_name};
use crate::resource::{Resource, Value};
use crate::topology::{SubnetInfo, VpcTopology, validate_topology};

pub use alb::{AlbTargetGroups, TargetGroupRef};

const OS_ACCESS_SECURITY_GROUP_NAME: &str = "os_cluster_access_sg";

/// The VPC the stack places its resources in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VpcReference {
    /// Declared by this stack under the given logical name
    Declared { name: String },
    /// Looked up by id
    Existing { vpc_id: String },
}

impl VpcReference {
    pub fn vpc_id(&self) -> Value {
        match self {
            VpcReference::Declared { name } => Value::reference(name.clone(), "vpc_id"),
            VpcReference::Existing { vpc_id } => Value::string(vpc_id.clone()),
        }
    }

    /// Subnet id of a topology entry; declared subnets are referenced by logical name
    pub fn subnet_id(&self, subnet: &SubnetInfo) -> Value {
        match self {
            VpcReference::Declared { .. } => {
                Value::reference(subnet.subnet_id.clone(), "subnet_id")
            }
            VpcReference::Existing { .. } => Value::string(subnet.subnet_id.clone()),
        }
    }
}

/// An SSM parameter published for sibling stacks
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedParameter {
    pub parameter: MigrationParameter,
    /// Full parameter path
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct NetworkStack {
    pub stage: String,
    pub vpc: VpcReference,
    pub topology: VpcTopology,
    /// Distinct AZs hosting a private subnet
    pub private_az_count: usize,
    /// Resources in declaration order, parameters included
    pub resources: Vec<Resource>,
    pub parameters: Vec<PublishedParameter>,
    pub alb: Option<AlbTargetGroups>,
}

impl NetworkStack {
    pub fn declare(props: &NetworkStackProps, context: &StackContext) -> StackResult<Self> {
        props.validate()?;

        let mut builder = StackBuilder::new(props);

        let (vpc, topology) = match &context.existing_vpc {
            Some(existing) => (
                VpcReference::Existing {
                    vpc_id: existing.vpc_id.clone(),
                },
                existing.topology.clone(),
            ),
            None => {
                let declared =
                    vpc::declare_vpc(&props.stage, props.az_count(), &context.availability_zones);
                builder.resources.extend(declared.resources);
                (
                    VpcReference::Declared {
                        name: vpc::VPC_NAME.to_string(),
                    },
                    declared.topology,
                )
            }
        };
        let private_az_count = validate_topology(&topology)?;
        builder.publish(MigrationParameter::VpcId, vpc.vpc_id());

        let alb = if props.alb_enabled {
            let settings = alb::AlbSettings {
                stage: &props.stage,
                region: &context.region,
                partition: context.partition,
                certificate_arn: props.alb_acm_cert_arn.as_deref(),
                source_cluster_enabled: props.source_service_enabled(),
            };
            let declared = alb::declare_alb(&settings, &vpc, &topology)?;
            builder.resources.extend(declared.resources);
            builder.publish(
                MigrationParameter::AlbMigrationUrl,
                Value::String(declared.migration_url),
            );
            Some(declared.target_groups)
        } else {
            None
        };

        let source_endpoint = source_cluster_endpoint(props)?;
        builder.publish(
            MigrationParameter::SourceClusterEndpoint,
            Value::String(source_endpoint),
        );

        if !props.is_add_on() {
            let security_group = Resource::new(types::SECURITY_GROUP, OS_ACCESS_SECURITY_GROUP_NAME)
                .with_attribute("vpc_id", vpc.vpc_id())
                .with_attribute(
                    "description",
                    format!("Migration cluster access for stage {}", props.stage),
                )
                .with_attribute("security_group_egress", Value::List(vec![deny_all_egress()]));
            let self_ingress = Resource::new(
                types::SECURITY_GROUP_INGRESS,
                format!("{}_self_ingress", OS_ACCESS_SECURITY_GROUP_NAME),
            )
            .with_attribute("security_group_id", security_group.attr("group_id"))
            .with_attribute("ip_protocol", "-1")
            .with_attribute("source_security_group_id", security_group.attr("group_id"));
            let group_id = security_group.attr("group_id");
            builder.resources.extend([security_group, self_ingress]);
            builder.publish(MigrationParameter::OsAccessSecurityGroupId, group_id);

            if let Some(endpoint) = &props.target_cluster_endpoint {
                let normalized = normalize_endpoint(endpoint)?;
                builder.publish(MigrationParameter::OsClusterEndpoint, Value::String(normalized));
            }
        }

        let stack = NetworkStack {
            stage: props.stage.clone(),
            vpc,
            topology,
            private_az_count,
            resources: builder.resources,
            parameters: builder.parameters,
            alb,
        };
        stack.check_unique_names()?;
        log::debug!(
            "Declared {} resources and {} parameters for stage {}",
            stack.resources.len(),
            stack.parameters.len(),
            stack.stage
        );
        Ok(stack)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name() == name)
    }

    pub fn parameter(&self, parameter: MigrationParameter) -> Option<&PublishedParameter> {
        self.parameters.iter().find(|p| p.parameter == parameter)
    }

    fn check_unique_names(&self) -> StackResult<()> {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.name()) {
                return Err(StackError::InvalidConfig(format!(
                    "resource name '{}' is declared twice",
                    resource.name()
                )));
            }
        }
        Ok(())
    }
}

/// Accumulates resources and parameters during declaration
struct StackBuilder<'a> {
    props: &'a NetworkStackProps,
    resources: Vec<Resource>,
    parameters: Vec<PublishedParameter>,
}

impl<'a> StackBuilder<'a> {
    fn new(props: &'a NetworkStackProps) -> Self {
        Self {
            props,
            resources: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Publish under the deployment's own deploy id
    fn publish(&mut self, parameter: MigrationParameter, value: Value) {
        let name = parameter_name(&self.props.stage, &self.props.default_deploy_id, parameter);
        self.resources.push(
            Resource::new(types::SSM_PARAMETER, parameter.resource_name())
                .with_attribute("name", name.as_str())
                .with_attribute("type", "String")
                .with_attribute("value", value.clone()),
        );
        self.parameters.push(PublishedParameter {
            parameter,
            name,
            value,
        });
    }
}

/// Endpoint sibling stacks use to reach the source cluster
fn source_cluster_endpoint(props: &NetworkStackProps) -> StackResult<String> {
    if let Some(endpoint) = &props.source_cluster_endpoint {
        return Ok(endpoint.clone());
    }
    if !props.source_service_enabled() {
        return Err(StackError::MissingSourceCluster);
    }
    let endpoint = if props.alb_enabled {
        format!(
            "https://{}:{}",
            alb::alb_zone_name(&props.stage),
            alb::SOURCE_CLUSTER_LISTENER_PORT
        )
    } else if props.capture_proxy_es_service_enabled {
        format!("https://capture-proxy-es.migration.{}.local:19200", props.stage)
    } else {
        format!("https://elasticsearch.migration.{}.local:9200", props.stage)
    };
    Ok(endpoint)
}

/// Egress rule matching no traffic, so the group allows no outbound connections
fn deny_all_egress() -> Value {
    Value::map([
        ("CidrIp", Value::string("255.255.255.255/32")),
        ("IpProtocol", Value::string("icmp")),
        ("FromPort", Value::Int(252)),
        ("ToPort", Value::Int(86)),
        ("Description", Value::string("Disallow all traffic")),
    ])
}
