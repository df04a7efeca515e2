//! Resource type configurations for the Cloud Control API

use netstack_core::stack::types;

/// Attribute mapping: (stack attribute name, CloudFormation property, is_read_only)
pub type AttrMapping = (&'static str, &'static str, bool);

/// Resource type configuration
pub struct ResourceConfig {
    /// AWS CloudFormation type name (e.g., "AWS::EC2::VPC")
    pub aws_type_name: &'static str,
    /// Attribute mappings (stack name -> CloudFormation name)
    pub attributes: &'static [AttrMapping],
    /// Property holding `[{Key, Value}]` tags, if the type is taggable
    pub tags_property: Option<&'static str>,
}

impl ResourceConfig {
    /// CloudFormation property a writable stack attribute is sent as
    pub fn aws_name(&self, attribute: &str) -> Option<&'static str> {
        self.writable()
            .find(|(name, _, _)| *name == attribute)
            .map(|(_, aws, _)| *aws)
    }

    /// Attributes that can be sent on create and update
    pub fn writable(&self) -> impl Iterator<Item = &AttrMapping> {
        self.attributes.iter().filter(|(_, _, read_only)| !read_only)
    }
}

// =============================================================================
// VPC Resources
// =============================================================================

pub const VPC_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::VPC",
    attributes: &[
        ("vpc_id", "VpcId", true),
        ("cidr_block", "CidrBlock", false),
        ("enable_dns_hostnames", "EnableDnsHostnames", false),
        ("enable_dns_support", "EnableDnsSupport", false),
    ],
    tags_property: Some("Tags"),
};

pub const SUBNET_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::Subnet",
    attributes: &[
        ("subnet_id", "SubnetId", true),
        ("vpc_id", "VpcId", false),
        ("cidr_block", "CidrBlock", false),
        ("availability_zone", "AvailabilityZone", false),
        ("map_public_ip_on_launch", "MapPublicIpOnLaunch", false),
    ],
    tags_property: Some("Tags"),
};

pub const INTERNET_GATEWAY_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::InternetGateway",
    attributes: &[("internet_gateway_id", "InternetGatewayId", true)],
    tags_property: Some("Tags"),
};

pub const VPC_GATEWAY_ATTACHMENT_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::VPCGatewayAttachment",
    attributes: &[
        ("vpc_id", "VpcId", false),
        ("internet_gateway_id", "InternetGatewayId", false),
    ],
    tags_property: None,
};

// =============================================================================
// Route Resources
// =============================================================================

pub const ROUTE_TABLE_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::RouteTable",
    attributes: &[
        ("route_table_id", "RouteTableId", true),
        ("vpc_id", "VpcId", false),
    ],
    tags_property: Some("Tags"),
};

pub const ROUTE_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::Route",
    attributes: &[
        ("route_table_id", "RouteTableId", false),
        ("destination_cidr_block", "DestinationCidrBlock", false),
        ("gateway_id", "GatewayId", false),
        ("nat_gateway_id", "NatGatewayId", false),
    ],
    tags_property: None,
};

pub const ROUTE_TABLE_ASSOCIATION_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::SubnetRouteTableAssociation",
    attributes: &[
        ("id", "Id", true),
        ("subnet_id", "SubnetId", false),
        ("route_table_id", "RouteTableId", false),
    ],
    tags_property: None,
};

// =============================================================================
// NAT / EIP Resources
// =============================================================================

pub const EIP_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::EIP",
    attributes: &[
        ("allocation_id", "AllocationId", true),
        ("public_ip", "PublicIp", true),
        ("domain", "Domain", false),
    ],
    tags_property: Some("Tags"),
};

pub const NAT_GATEWAY_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::NatGateway",
    attributes: &[
        ("nat_gateway_id", "NatGatewayId", true),
        ("subnet_id", "SubnetId", false),
        ("allocation_id", "AllocationId", false),
    ],
    tags_property: Some("Tags"),
};

// =============================================================================
// Security Group Resources
// =============================================================================

pub const SECURITY_GROUP_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::SecurityGroup",
    attributes: &[
        ("group_id", "GroupId", true),
        ("vpc_id", "VpcId", false),
        ("description", "GroupDescription", false),
        ("security_group_egress", "SecurityGroupEgress", false),
    ],
    tags_property: Some("Tags"),
};

pub const SECURITY_GROUP_INGRESS_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::EC2::SecurityGroupIngress",
    attributes: &[
        ("id", "Id", true),
        ("security_group_id", "GroupId", false),
        ("ip_protocol", "IpProtocol", false),
        ("from_port", "FromPort", false),
        ("to_port", "ToPort", false),
        ("cidr_ip", "CidrIp", false),
        ("source_security_group_id", "SourceSecurityGroupId", false),
    ],
    tags_property: None,
};

// =============================================================================
// Load Balancer Resources
// =============================================================================

pub const LOAD_BALANCER_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::ElasticLoadBalancingV2::LoadBalancer",
    attributes: &[
        ("load_balancer_arn", "LoadBalancerArn", true),
        ("dns_name", "DNSName", true),
        ("canonical_hosted_zone_id", "CanonicalHostedZoneID", true),
        ("type", "Type", false),
        ("scheme", "Scheme", false),
        ("subnets", "Subnets", false),
        ("security_groups", "SecurityGroups", false),
        ("load_balancer_attributes", "LoadBalancerAttributes", false),
    ],
    tags_property: Some("Tags"),
};

pub const TARGET_GROUP_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::ElasticLoadBalancingV2::TargetGroup",
    attributes: &[
        ("target_group_arn", "TargetGroupArn", true),
        ("name", "Name", false),
        ("protocol", "Protocol", false),
        ("protocol_version", "ProtocolVersion", false),
        ("port", "Port", false),
        ("vpc_id", "VpcId", false),
        ("target_type", "TargetType", false),
        ("health_check_path", "HealthCheckPath", false),
        ("matcher", "Matcher", false),
    ],
    tags_property: Some("Tags"),
};

pub const LISTENER_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::ElasticLoadBalancingV2::Listener",
    attributes: &[
        ("listener_arn", "ListenerArn", true),
        ("load_balancer_arn", "LoadBalancerArn", false),
        ("port", "Port", false),
        ("protocol", "Protocol", false),
        ("ssl_policy", "SslPolicy", false),
        ("certificates", "Certificates", false),
        ("default_actions", "DefaultActions", false),
    ],
    tags_property: None,
};

// =============================================================================
// DNS Resources
// =============================================================================

pub const HOSTED_ZONE_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::Route53::HostedZone",
    attributes: &[
        ("id", "Id", true),
        ("name", "Name", false),
        ("vpcs", "VPCs", false),
    ],
    tags_property: Some("HostedZoneTags"),
};

pub const RECORD_SET_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::Route53::RecordSet",
    attributes: &[
        ("id", "Id", true),
        ("hosted_zone_id", "HostedZoneId", false),
        ("name", "Name", false),
        ("type", "Type", false),
        ("alias_target", "AliasTarget", false),
    ],
    tags_property: None,
};

// =============================================================================
// Parameter Resources
// =============================================================================

pub const SSM_PARAMETER_CONFIG: ResourceConfig = ResourceConfig {
    aws_type_name: "AWS::SSM::Parameter",
    attributes: &[
        ("name", "Name", false),
        ("type", "Type", false),
        ("value", "Value", false),
    ],
    tags_property: None,
};

// =============================================================================
// Config Lookup
// =============================================================================

/// Get resource configuration by stack resource type
pub fn get_resource_config(resource_type: &str) -> Option<&'static ResourceConfig> {
    match resource_type {
        types::VPC => Some(&VPC_CONFIG),
        types::SUBNET => Some(&SUBNET_CONFIG),
        types::INTERNET_GATEWAY => Some(&INTERNET_GATEWAY_CONFIG),
        types::VPC_GATEWAY_ATTACHMENT => Some(&VPC_GATEWAY_ATTACHMENT_CONFIG),
        types::ROUTE_TABLE => Some(&ROUTE_TABLE_CONFIG),
        types::ROUTE => Some(&ROUTE_CONFIG),
        types::SUBNET_ROUTE_TABLE_ASSOCIATION => Some(&ROUTE_TABLE_ASSOCIATION_CONFIG),
        types::EIP => Some(&EIP_CONFIG),
        types::NAT_GATEWAY => Some(&NAT_GATEWAY_CONFIG),
        types::SECURITY_GROUP => Some(&SECURITY_GROUP_CONFIG),
        types::SECURITY_GROUP_INGRESS => Some(&SECURITY_GROUP_INGRESS_CONFIG),
        types::LOAD_BALANCER => Some(&LOAD_BALANCER_CONFIG),
        types::TARGET_GROUP => Some(&TARGET_GROUP_CONFIG),
        types::LISTENER => Some(&LISTENER_CONFIG),
        types::HOSTED_ZONE => Some(&HOSTED_ZONE_CONFIG),
        types::RECORD_SET => Some(&RECORD_SET_CONFIG),
        types::SSM_PARAMETER => Some(&SSM_PARAMETER_CONFIG),
        _ => None,
    }
}
