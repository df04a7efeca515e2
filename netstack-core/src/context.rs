//! Context - Facts looked up before the stack is declared
//!
//! Declaration itself is synchronous and side-effect free; everything it
//! needs from the cloud is gathered here first.

use std::fmt;

use crate::config::NetworkStackProps;
use crate::error::{StackError, StackResult};
use crate::parameter::{MigrationParameter, parameter_name};
use crate::provider::Lookup;
use crate::topology::VpcTopology;

/// AWS partition, derived from the region name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Aws,
    AwsCn,
    AwsUsGov,
}

impl Partition {
    pub fn from_region(region: &str) -> Self {
        if region.starts_with("us-gov-") {
            Partition::AwsUsGov
        } else if region.starts_with("cn-") {
            Partition::AwsCn
        } else {
            Partition::Aws
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Aws => "aws",
            Partition::AwsCn => "aws-cn",
            Partition::AwsUsGov => "aws-us-gov",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A VPC that already exists and is reused by this stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingVpc {
    pub vpc_id: String,
    pub topology: VpcTopology,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackContext {
    pub region: String,
    pub partition: Partition,
    /// Available zones of the region; only looked up when a VPC is created
    pub availability_zones: Vec<String>,
    pub existing_vpc: Option<ExistingVpc>,
}

impl StackContext {
    /// Context for declaring a new VPC across the given zones
    pub fn for_new_vpc(region: impl Into<String>, availability_zones: Vec<String>) -> Self {
        let region = region.into();
        Self {
            partition: Partition::from_region(&region),
            region,
            availability_zones,
            existing_vpc: None,
        }
    }

    /// Context for reusing an existing VPC
    pub fn for_existing_vpc(
        region: impl Into<String>,
        vpc_id: impl Into<String>,
        topology: VpcTopology,
    ) -> Self {
        let region = region.into();
        Self {
            partition: Partition::from_region(&region),
            region,
            availability_zones: Vec::new(),
            existing_vpc: Some(ExistingVpc {
                vpc_id: vpc_id.into(),
                topology,
            }),
        }
    }

    /// Gather the lookups the props call for
    ///
    /// - add-on deployments reuse the VPC published by the deployment they extend
    /// - an explicit `vpcId` is looked up directly
    /// - otherwise the region's zones are listed so a new VPC can be laid out
    pub async fn resolve<L: Lookup + ?Sized>(
        props: &NetworkStackProps,
        region: &str,
        lookup: &L,
    ) -> StackResult<Self> {
        props.validate()?;

        let vpc_id = if let Some(add_on_id) = &props.add_on_migration_deploy_id {
            let name = parameter_name(&props.stage, add_on_id, MigrationParameter::VpcId);
            log::debug!("Reading VPC id of add-on deployment from {}", name);
            let vpc_id = lookup
                .lookup_string_parameter(&name)
                .await?
                .ok_or(StackError::MissingParameter(name))?;
            Some(vpc_id)
        } else {
            props.vpc_id.clone()
        };

        match vpc_id {
            Some(vpc_id) => {
                log::debug!("Looking up existing VPC {}", vpc_id);
                let topology = lookup.lookup_vpc(&vpc_id).await?;
                Ok(Self::for_existing_vpc(region, vpc_id, topology))
            }
            None => {
                let zones = lookup.availability_zones().await?;
                log::debug!("Region {} has zones {:?}", region, zones);
                Ok(Self::for_new_vpc(region, zones))
            }
        }
    }
}
