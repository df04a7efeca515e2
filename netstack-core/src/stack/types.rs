//! Resource type names declared by the network stack

pub const VPC: &str = "ec2_vpc";
pub const SUBNET: &str = "ec2_subnet";
pub const INTERNET_GATEWAY: &str = "ec2_internet_gateway";
pub const VPC_GATEWAY_ATTACHMENT: &str = "ec2_vpc_gateway_attachment";
pub const ROUTE_TABLE: &str = "ec2_route_table";
pub const ROUTE: &str = "ec2_route";
pub const SUBNET_ROUTE_TABLE_ASSOCIATION: &str = "ec2_subnet_route_table_association";
pub const EIP: &str = "ec2_eip";
pub const NAT_GATEWAY: &str = "ec2_nat_gateway";
pub const SECURITY_GROUP: &str = "ec2_security_group";
pub const SECURITY_GROUP_INGRESS: &str = "ec2_security_group_ingress";
pub const LOAD_BALANCER: &str = "elbv2_load_balancer";
pub const TARGET_GROUP: &str = "elbv2_target_group";
pub const LISTENER: &str = "elbv2_listener";
pub const HOSTED_ZONE: &str = "route53_hosted_zone";
pub const RECORD_SET: &str = "route53_record_set";
pub const SSM_PARAMETER: &str = "ssm_parameter";
/// Self-signed certificate generated locally and imported into ACM
pub const IMPORTED_CERTIFICATE: &str = "acm_imported_certificate";

/// Every type the stack can declare
pub const ALL: &[&str] = &[
    VPC,
    SUBNET,
    INTERNET_GATEWAY,
    VPC_GATEWAY_ATTACHMENT,
    ROUTE_TABLE,
    ROUTE,
    SUBNET_ROUTE_TABLE_ASSOCIATION,
    EIP,
    NAT_GATEWAY,
    SECURITY_GROUP,
    SECURITY_GROUP_INGRESS,
    LOAD_BALANCER,
    TARGET_GROUP,
    LISTENER,
    HOSTED_ZONE,
    RECORD_SET,
    SSM_PARAMETER,
    IMPORTED_CERTIFICATE,
];
