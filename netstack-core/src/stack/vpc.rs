//! VPC declaration for deployments that do not reuse an existing network
//!
//! Layout: one public and one private `/24` per AZ, public subnets first.
//! Each private subnet routes through a NAT gateway in the public subnet of
//! the same AZ.

use crate::resource::{Resource, Value};
use crate::topology::{SubnetInfo, SubnetKind, VpcTopology};

use super::types;

pub const VPC_NAME: &str = "domain_vpc";
pub const VPC_CIDR: &str = "10.0.0.0/16";

const INTERNET_GATEWAY_NAME: &str = "internet_gateway";
const GATEWAY_ATTACHMENT_NAME: &str = "internet_gateway_attachment";
const ANY_IPV4: &str = "0.0.0.0/0";

/// Resources of a newly declared VPC and the topology they form
#[derive(Debug, Clone)]
pub struct DeclaredVpc {
    pub resources: Vec<Resource>,
    /// Subnet ids are the logical names of the declared subnets
    pub topology: VpcTopology,
}

/// Declare a VPC spread over the first `az_count` of `zones`
pub fn declare_vpc(stage: &str, az_count: u8, zones: &[String]) -> DeclaredVpc {
    let zones: Vec<&String> = zones.iter().take(usize::from(az_count)).collect();
    let zone_count = zones.len();

    let vpc = Resource::new(types::VPC, VPC_NAME)
        .with_attribute("cidr_block", VPC_CIDR)
        .with_attribute("enable_dns_hostnames", true)
        .with_attribute("enable_dns_support", true)
        .with_attribute("tags", name_tag(format!("migration-{}-vpc", stage)));
    let vpc_id = vpc.attr("vpc_id");

    let igw = Resource::new(types::INTERNET_GATEWAY, INTERNET_GATEWAY_NAME)
        .with_attribute("tags", name_tag(format!("migration-{}-igw", stage)));
    let attachment = Resource::new(types::VPC_GATEWAY_ATTACHMENT, GATEWAY_ATTACHMENT_NAME)
        .with_attribute("vpc_id", vpc_id.clone())
        .with_attribute("internet_gateway_id", igw.attr("internet_gateway_id"));

    let mut resources = vec![vpc, igw, attachment];
    let mut subnets = Vec::with_capacity(zone_count * 2);
    let mut private_subnets = Vec::new();

    for (index, zone) in zones.iter().enumerate() {
        let n = index + 1;

        let public = Resource::new(types::SUBNET, format!("public_subnet_{}", n))
            .with_attribute("vpc_id", vpc_id.clone())
            .with_attribute("cidr_block", subnet_cidr(index))
            .with_attribute("availability_zone", zone.as_str())
            .with_attribute("map_public_ip_on_launch", true)
            .with_attribute(
                "tags",
                name_tag(format!("migration-{}-public-subnet-{}", stage, n)),
            );
        let public_rt = Resource::new(types::ROUTE_TABLE, format!("public_route_table_{}", n))
            .with_attribute("vpc_id", vpc_id.clone());
        let public_assoc = Resource::new(
            types::SUBNET_ROUTE_TABLE_ASSOCIATION,
            format!("public_route_table_association_{}", n),
        )
        .with_attribute("subnet_id", public.attr("subnet_id"))
        .with_attribute("route_table_id", public_rt.attr("route_table_id"));
        let public_route = Resource::new(types::ROUTE, format!("public_default_route_{}", n))
            .with_attribute("route_table_id", public_rt.attr("route_table_id"))
            .with_attribute("destination_cidr_block", ANY_IPV4)
            .with_attribute(
                "gateway_id",
                Value::reference(INTERNET_GATEWAY_NAME, "internet_gateway_id"),
            )
            .with_dependency(GATEWAY_ATTACHMENT_NAME);

        let eip = Resource::new(types::EIP, format!("nat_eip_{}", n))
            .with_attribute("domain", "vpc")
            .with_dependency(GATEWAY_ATTACHMENT_NAME);
        let nat = Resource::new(types::NAT_GATEWAY, format!("nat_gateway_{}", n))
            .with_attribute("subnet_id", public.attr("subnet_id"))
            .with_attribute("allocation_id", eip.attr("allocation_id"))
            .with_attribute("tags", name_tag(format!("migration-{}-nat-{}", stage, n)))
            .with_dependency(public_route.name());

        let private = Resource::new(types::SUBNET, format!("private_subnet_{}", n))
            .with_attribute("vpc_id", vpc_id.clone())
            .with_attribute("cidr_block", subnet_cidr(zone_count + index))
            .with_attribute("availability_zone", zone.as_str())
            .with_attribute("map_public_ip_on_launch", false)
            .with_attribute(
                "tags",
                name_tag(format!("migration-{}-private-subnet-{}", stage, n)),
            );
        let private_rt = Resource::new(types::ROUTE_TABLE, format!("private_route_table_{}", n))
            .with_attribute("vpc_id", vpc_id.clone());
        let private_assoc = Resource::new(
            types::SUBNET_ROUTE_TABLE_ASSOCIATION,
            format!("private_route_table_association_{}", n),
        )
        .with_attribute("subnet_id", private.attr("subnet_id"))
        .with_attribute("route_table_id", private_rt.attr("route_table_id"));
        let private_route = Resource::new(types::ROUTE, format!("private_default_route_{}", n))
            .with_attribute("route_table_id", private_rt.attr("route_table_id"))
            .with_attribute("destination_cidr_block", ANY_IPV4)
            .with_attribute("nat_gateway_id", nat.attr("nat_gateway_id"));

        subnets.push(SubnetInfo::new(public.name(), zone.as_str(), SubnetKind::Public));
        private_subnets.push(SubnetInfo::new(
            private.name(),
            zone.as_str(),
            SubnetKind::PrivateWithEgress,
        ));

        resources.extend([
            public,
            public_rt,
            public_assoc,
            public_route,
            eip,
            nat,
            private,
            private_rt,
            private_assoc,
            private_route,
        ]);
    }
    subnets.extend(private_subnets);

    DeclaredVpc {
        resources,
        topology: VpcTopology::new(subnets),
    }
}

/// `index`-th `/24` block of the VPC CIDR
fn subnet_cidr(index: usize) -> String {
    format!("10.0.{}.0/24", index)
}

fn name_tag(name: String) -> Value {
    Value::map([("Name", Value::String(name))])
}
