//! Internal application load balancer fronting the migration services
//!
//! The migration listener splits traffic between the source and target
//! proxies by weight; shifting the weights moves clients from one cluster
//! to the other without changing their endpoint.

use crate::context::Partition;
use crate::error::{StackError, StackResult};
use crate::resource::{Resource, Value};
use crate::topology::{SubnetKind, VpcTopology};

use super::VpcReference;
use super::types;

/// Port the migration services listen on inside the VPC
pub const SERVICE_PORT: i64 = 9200;
/// Listener port routing to the source cluster
pub const SOURCE_CLUSTER_LISTENER_PORT: i64 = 19200;
/// Listener port routing between source and target proxies
pub const MIGRATION_LISTENER_PORT: i64 = 9200;

const MAX_TARGET_GROUP_NAME_LEN: usize = 32;

const SSL_POLICY_FIPS: &str = "ELBSecurityPolicy-TLS13-1-2-Ext2-FIPS-2023-04";
const SSL_POLICY_RECOMMENDED: &str = "ELBSecurityPolicy-TLS13-1-2-2021-06";

const ALB_NAME: &str = "alb";
const SECURITY_GROUP_NAME: &str = "alb_security_group";
const HOSTED_ZONE_NAME: &str = "alb_hosted_zone";
const CERTIFICATE_NAME: &str = "alb_certificate";

/// DNS zone serving the ALB alias record
pub fn alb_zone_name(stage: &str) -> String {
    format!("alb.migration.{}.local", stage)
}

/// SSL policy for HTTPS listeners in `partition`
pub fn ssl_policy(partition: Partition) -> &'static str {
    match partition {
        Partition::AwsUsGov => SSL_POLICY_FIPS,
        Partition::Aws | Partition::AwsCn => SSL_POLICY_RECOMMENDED,
    }
}

/// Inputs of the ALB declaration
#[derive(Debug, Clone)]
pub struct AlbSettings<'a> {
    pub stage: &'a str,
    pub region: &'a str,
    pub partition: Partition,
    /// Listener certificate; a self-signed one for the ALB domain is
    /// imported when absent
    pub certificate_arn: Option<&'a str>,
    /// Declare the source-cluster target group and its listener
    pub source_cluster_enabled: bool,
}

/// A declared target group: logical resource name and the cloud-side name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroupRef {
    pub resource_name: String,
    pub target_group_name: String,
}

/// Target groups the migration services register with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbTargetGroups {
    pub source_proxy: TargetGroupRef,
    pub target_proxy: TargetGroupRef,
    pub source_cluster: Option<TargetGroupRef>,
}

#[derive(Debug, Clone)]
pub struct DeclaredAlb {
    pub resources: Vec<Resource>,
    pub target_groups: AlbTargetGroups,
    /// `https://` URL of the alias record
    pub migration_url: String,
}

pub fn declare_alb(
    settings: &AlbSettings<'_>,
    vpc: &VpcReference,
    topology: &VpcTopology,
) -> StackResult<DeclaredAlb> {
    let zone_name = alb_zone_name(settings.stage);
    let mut listener_ports = vec![MIGRATION_LISTENER_PORT];
    if settings.source_cluster_enabled {
        listener_ports.push(SOURCE_CLUSTER_LISTENER_PORT);
    }

    let security_group = Resource::new(types::SECURITY_GROUP, SECURITY_GROUP_NAME)
        .with_attribute("vpc_id", vpc.vpc_id())
        .with_attribute(
            "description",
            format!("Migration ALB security group for stage {}", settings.stage),
        );
    let mut ingress_rules = Vec::new();
    for port in &listener_ports {
        ingress_rules.push(
            Resource::new(
                types::SECURITY_GROUP_INGRESS,
                format!("alb_security_group_ingress_{}", port),
            )
            .with_attribute("security_group_id", security_group.attr("group_id"))
            .with_attribute("ip_protocol", "tcp")
            .with_attribute("from_port", *port)
            .with_attribute("to_port", *port)
            .with_attribute("cidr_ip", "0.0.0.0/0"),
        );
    }

    let subnets = topology
        .one_per_az(SubnetKind::PrivateWithEgress)
        .into_iter()
        .map(|subnet| vpc.subnet_id(subnet))
        .collect();
    let alb = Resource::new(types::LOAD_BALANCER, ALB_NAME)
        .with_attribute("type", "application")
        .with_attribute("scheme", "internal")
        .with_attribute("subnets", Value::List(subnets))
        .with_attribute(
            "security_groups",
            Value::List(vec![security_group.attr("group_id")]),
        )
        .with_attribute(
            "load_balancer_attributes",
            Value::List(vec![Value::map([
                ("Key", Value::string("routing.http2.enabled")),
                ("Value", Value::string("false")),
            ])]),
        );

    let hosted_zone = Resource::new(types::HOSTED_ZONE, HOSTED_ZONE_NAME)
        .with_attribute("name", zone_name.as_str())
        .with_attribute(
            "vpcs",
            Value::List(vec![Value::map([
                ("VPCId", vpc.vpc_id()),
                ("VPCRegion", Value::string(settings.region)),
            ])]),
        );
    let record = Resource::new(types::RECORD_SET, "alb_dns_record")
        .with_attribute("hosted_zone_id", hosted_zone.attr("id"))
        .with_attribute("name", zone_name.as_str())
        .with_attribute("type", "A")
        .with_attribute(
            "alias_target",
            Value::map([
                ("DNSName", alb.attr("dns_name")),
                ("HostedZoneId", alb.attr("canonical_hosted_zone_id")),
            ]),
        );

    let mut certificate = None;
    let certificate_arn = match settings.certificate_arn {
        Some(arn) => Value::string(arn),
        None => {
            let imported = Resource::new(types::IMPORTED_CERTIFICATE, CERTIFICATE_NAME)
                .with_attribute("domain_name", zone_name.as_str());
            let arn = imported.attr("certificate_arn");
            certificate = Some(imported);
            arn
        }
    };

    let (source_proxy_tg, source_proxy) =
        target_group("ALBSourceProxy", "alb_source_proxy_tg", settings.stage, vpc)?;
    let (target_proxy_tg, target_proxy) =
        target_group("ALBTargetProxy", "alb_target_proxy_tg", settings.stage, vpc)?;

    let policy = ssl_policy(settings.partition);
    let mut source_cluster = None;
    let mut source_cluster_resources = Vec::new();
    if settings.source_cluster_enabled {
        let (tg, reference) = target_group(
            "ALBSourceCluster",
            "alb_source_cluster_tg",
            settings.stage,
            vpc,
        )?;
        let listener = https_listener(
            "alb_source_cluster_listener",
            SOURCE_CLUSTER_LISTENER_PORT,
            &alb,
            &certificate_arn,
            policy,
        )
        .with_attribute(
            "default_actions",
            Value::List(vec![Value::map([
                ("Type", Value::string("forward")),
                ("TargetGroupArn", tg.attr("target_group_arn")),
            ])]),
        );
        source_cluster_resources.extend([tg, listener]);
        source_cluster = Some(reference);
    }

    let migration_listener = https_listener(
        "alb_migration_listener",
        MIGRATION_LISTENER_PORT,
        &alb,
        &certificate_arn,
        policy,
    )
    .with_attribute(
        "default_actions",
        Value::List(vec![Value::map([
            ("Type", Value::string("forward")),
            (
                "ForwardConfig",
                Value::map([(
                    "TargetGroups",
                    Value::List(vec![
                        weighted(&source_proxy_tg, 1),
                        weighted(&target_proxy_tg, 0),
                    ]),
                )]),
            ),
        ])]),
    );

    let mut declared: Vec<Resource> = certificate.into_iter().collect();
    declared.push(security_group);
    declared.append(&mut ingress_rules);
    declared.extend([alb, hosted_zone, record, source_proxy_tg, target_proxy_tg]);
    declared.extend(source_cluster_resources);
    declared.push(migration_listener);

    Ok(DeclaredAlb {
        resources: declared,
        target_groups: AlbTargetGroups {
            source_proxy,
            target_proxy,
            source_cluster,
        },
        migration_url: format!("https://{}", zone_name),
    })
}

/// Target group named `{service}-{stage}-TG`
fn target_group(
    service: &str,
    resource_name: &str,
    stage: &str,
    vpc: &VpcReference,
) -> StackResult<(Resource, TargetGroupRef)> {
    let name = format!("{}-{}-TG", service, stage);
    validate_target_group_name(&name)?;

    let resource = Resource::new(types::TARGET_GROUP, resource_name)
        .with_attribute("name", name.as_str())
        .with_attribute("protocol", "HTTPS")
        .with_attribute("protocol_version", "HTTP1")
        .with_attribute("port", SERVICE_PORT)
        .with_attribute("vpc_id", vpc.vpc_id())
        .with_attribute("target_type", "ip")
        .with_attribute("health_check_path", "/")
        .with_attribute("matcher", Value::map([("HttpCode", Value::string("200,401"))]));

    Ok((
        resource,
        TargetGroupRef {
            resource_name: resource_name.to_string(),
            target_group_name: name,
        },
    ))
}

fn https_listener(
    name: &str,
    port: i64,
    alb: &Resource,
    certificate_arn: &Value,
    ssl_policy: &str,
) -> Resource {
    Resource::new(types::LISTENER, name)
        .with_attribute("load_balancer_arn", alb.attr("load_balancer_arn"))
        .with_attribute("port", port)
        .with_attribute("protocol", "HTTPS")
        .with_attribute("ssl_policy", ssl_policy)
        .with_attribute(
            "certificates",
            Value::List(vec![Value::map([(
                "CertificateArn",
                certificate_arn.clone(),
            )])]),
        )
}

fn weighted(target_group: &Resource, weight: i64) -> Value {
    Value::map([
        ("TargetGroupArn", target_group.attr("target_group_arn")),
        ("Weight", Value::Int(weight)),
    ])
}

/// Target group names are at most 32 alphanumerics or hyphens and must not
/// start or end with a hyphen
pub fn validate_target_group_name(name: &str) -> StackResult<()> {
    let invalid = |reason: String| StackError::InvalidTargetGroupName {
        name: name.to_string(),
        reason,
    };

    if name.len() > MAX_TARGET_GROUP_NAME_LEN {
        return Err(invalid(format!(
            "must be at most {} characters, got {}",
            MAX_TARGET_GROUP_NAME_LEN,
            name.len()
        )));
    }
    if let Some(c) = name.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
        return Err(invalid(format!("contains invalid character '{}'", c)));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must not begin or end with a hyphen".to_string()));
    }
    Ok(())
}
