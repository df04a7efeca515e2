//! Lookups answered before the stack is declared
//!
//! Subnets of an existing VPC are classified the way CDK's VPC lookup does:
//! an `aws-cdk:subnet-type` tag wins, otherwise the subnet's route table
//! decides. Subnets without an explicit association use the main route table.

use std::collections::HashMap;

use aws_sdk_ec2::types::Filter;
use netstack_core::provider::{ProviderError, ProviderResult};
use netstack_core::topology::{SubnetInfo, SubnetKind, VpcTopology};

use crate::provider::AwsProvider;

const SUBNET_TYPE_TAG: &str = "aws-cdk:subnet-type";
const SSM_PARAMETER_TYPE: &str = "AWS::SSM::Parameter";

/// Where a route table sends `0.0.0.0/0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultRoute {
    None,
    InternetGateway,
    /// NAT gateway, NAT instance, transit gateway, ...
    Other,
}

#[derive(Debug, Clone)]
pub struct SubnetDescription {
    pub subnet_id: String,
    pub availability_zone: String,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RouteTableDescription {
    pub is_main: bool,
    pub subnet_ids: Vec<String>,
    pub default_route: DefaultRoute,
}

/// Classify subnets into a topology, keeping their order
pub fn classify_subnets(
    subnets: &[SubnetDescription],
    route_tables: &[RouteTableDescription],
) -> VpcTopology {
    let main_route = route_tables
        .iter()
        .find(|rt| rt.is_main)
        .map(|rt| rt.default_route)
        .unwrap_or(DefaultRoute::None);

    let mut by_subnet: HashMap<&str, DefaultRoute> = HashMap::new();
    for rt in route_tables {
        for subnet_id in &rt.subnet_ids {
            by_subnet.insert(subnet_id.as_str(), rt.default_route);
        }
    }

    let infos = subnets
        .iter()
        .map(|subnet| {
            let kind = subnet
                .tags
                .get(SUBNET_TYPE_TAG)
                .and_then(|tag| kind_from_tag(tag))
                .unwrap_or_else(|| {
                    let route = by_subnet
                        .get(subnet.subnet_id.as_str())
                        .copied()
                        .unwrap_or(main_route);
                    kind_from_route(route)
                });
            SubnetInfo::new(&subnet.subnet_id, &subnet.availability_zone, kind)
        })
        .collect();

    VpcTopology::new(infos)
}

fn kind_from_tag(tag: &str) -> Option<SubnetKind> {
    match tag {
        "Public" => Some(SubnetKind::Public),
        "Private" => Some(SubnetKind::PrivateWithEgress),
        "Isolated" => Some(SubnetKind::Isolated),
        _ => None,
    }
}

fn kind_from_route(route: DefaultRoute) -> SubnetKind {
    match route {
        DefaultRoute::InternetGateway => SubnetKind::Public,
        DefaultRoute::Other => SubnetKind::PrivateWithEgress,
        DefaultRoute::None => SubnetKind::Isolated,
    }
}

impl AwsProvider {
    /// Names of available zones of the region, excluding local and wavelength zones
    pub async fn describe_availability_zones(&self) -> ProviderResult<Vec<String>> {
        let filter = Filter::builder().name("state").values("available").build();

        let result = self
            .ec2_client
            .describe_availability_zones()
            .filters(filter)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!("Failed to describe availability zones: {:?}", e))
            })?;

        let mut zones: Vec<String> = result
            .availability_zones()
            .iter()
            .filter(|az| az.zone_type().is_none_or(|t| t == "availability-zone"))
            .filter_map(|az| az.zone_name().map(|s| s.to_string()))
            .collect();
        zones.sort();
        Ok(zones)
    }

    /// Subnet layout of an existing VPC
    pub async fn describe_vpc_topology(&self, vpc_id: &str) -> ProviderResult<VpcTopology> {
        let vpcs = self
            .ec2_client
            .describe_vpcs()
            .vpc_ids(vpc_id)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to describe VPC {}: {:?}", vpc_id, e)))?;
        if vpcs.vpcs().is_empty() {
            return Err(ProviderError::new(format!("VPC {} not found", vpc_id)));
        }

        let vpc_filter = || Filter::builder().name("vpc-id").values(vpc_id).build();

        let subnets = self
            .ec2_client
            .describe_subnets()
            .filters(vpc_filter())
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to describe subnets: {:?}", e)))?;
        let subnets: Vec<SubnetDescription> = subnets
            .subnets()
            .iter()
            .filter_map(|s| {
                Some(SubnetDescription {
                    subnet_id: s.subnet_id()?.to_string(),
                    availability_zone: s.availability_zone()?.to_string(),
                    tags: s
                        .tags()
                        .iter()
                        .filter_map(|t| Some((t.key()?.to_string(), t.value()?.to_string())))
                        .collect(),
                })
            })
            .collect();

        let route_tables = self
            .ec2_client
            .describe_route_tables()
            .filters(vpc_filter())
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!("Failed to describe route tables: {:?}", e))
            })?;
        let route_tables: Vec<RouteTableDescription> = route_tables
            .route_tables()
            .iter()
            .map(|rt| {
                let default_route = rt
                    .routes()
                    .iter()
                    .find(|r| r.destination_cidr_block() == Some("0.0.0.0/0"))
                    .map(|r| match r.gateway_id() {
                        Some(gw) if gw.starts_with("igw-") => DefaultRoute::InternetGateway,
                        _ => DefaultRoute::Other,
                    })
                    .unwrap_or(DefaultRoute::None);
                RouteTableDescription {
                    is_main: rt.associations().iter().any(|a| a.main() == Some(true)),
                    subnet_ids: rt
                        .associations()
                        .iter()
                        .filter_map(|a| a.subnet_id().map(|s| s.to_string()))
                        .collect(),
                    default_route,
                }
            })
            .collect();

        log::debug!(
            "VPC {} has {} subnets and {} route tables",
            vpc_id,
            subnets.len(),
            route_tables.len()
        );
        Ok(classify_subnets(&subnets, &route_tables))
    }

    /// Value of a String parameter, or None if it does not exist
    pub async fn read_string_parameter(&self, name: &str) -> ProviderResult<Option<String>> {
        let props = self.cc_get_resource(SSM_PARAMETER_TYPE, name).await?;
        Ok(props.and_then(|p| p.get("Value").and_then(|v| v.as_str()).map(|s| s.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(id: &str, az: &str, tags: &[(&str, &str)]) -> SubnetDescription {
        SubnetDescription {
            subnet_id: id.to_string(),
            availability_zone: az.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn route_table(is_main: bool, subnets: &[&str], default_route: DefaultRoute) -> RouteTableDescription {
        RouteTableDescription {
            is_main,
            subnet_ids: subnets.iter().map(|s| s.to_string()).collect(),
            default_route,
        }
    }

    fn kinds(topology: &VpcTopology) -> Vec<(&str, SubnetKind)> {
        topology
            .subnets
            .iter()
            .map(|s| (s.subnet_id.as_str(), s.kind))
            .collect()
    }

    #[test]
    fn classifies_by_default_route() {
        let subnets = vec![
            subnet("subnet-pub", "us-east-1a", &[]),
            subnet("subnet-priv", "us-east-1a", &[]),
            subnet("subnet-iso", "us-east-1b", &[]),
        ];
        let route_tables = vec![
            route_table(false, &["subnet-pub"], DefaultRoute::InternetGateway),
            route_table(false, &["subnet-priv"], DefaultRoute::Other),
            route_table(false, &["subnet-iso"], DefaultRoute::None),
        ];

        assert_eq!(
            kinds(&classify_subnets(&subnets, &route_tables)),
            vec![
                ("subnet-pub", SubnetKind::Public),
                ("subnet-priv", SubnetKind::PrivateWithEgress),
                ("subnet-iso", SubnetKind::Isolated),
            ]
        );
    }

    #[test]
    fn tag_overrides_routes() {
        let subnets = vec![subnet(
            "subnet-a",
            "us-east-1a",
            &[(SUBNET_TYPE_TAG, "Private")],
        )];
        let route_tables = vec![route_table(false, &["subnet-a"], DefaultRoute::None)];

        assert_eq!(
            kinds(&classify_subnets(&subnets, &route_tables)),
            vec![("subnet-a", SubnetKind::PrivateWithEgress)]
        );
    }

    #[test]
    fn unknown_tag_falls_back_to_routes() {
        let subnets = vec![subnet("subnet-a", "us-east-1a", &[(SUBNET_TYPE_TAG, "Reserved")])];
        let route_tables = vec![route_table(false, &["subnet-a"], DefaultRoute::InternetGateway)];

        assert_eq!(
            kinds(&classify_subnets(&subnets, &route_tables)),
            vec![("subnet-a", SubnetKind::Public)]
        );
    }

    #[test]
    fn unassociated_subnets_use_main_route_table() {
        let subnets = vec![
            subnet("subnet-a", "us-east-1a", &[]),
            subnet("subnet-b", "us-east-1b", &[]),
        ];
        let route_tables = vec![
            route_table(true, &[], DefaultRoute::Other),
            route_table(false, &["subnet-b"], DefaultRoute::InternetGateway),
        ];

        let topology = classify_subnets(&subnets, &route_tables);
        assert_eq!(
            kinds(&topology),
            vec![
                ("subnet-a", SubnetKind::PrivateWithEgress),
                ("subnet-b", SubnetKind::Public),
            ]
        );
    }

    #[test]
    fn no_route_tables_means_isolated() {
        let subnets = vec![subnet("subnet-a", "us-east-1a", &[])];
        assert_eq!(
            kinds(&classify_subnets(&subnets, &[])),
            vec![("subnet-a", SubnetKind::Isolated)]
        );
    }
}
