//! Topology - Subnet layout of a VPC and its validation
//!
//! The migration services run in private subnets and need at least two
//! availability zones to be placed in.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{StackError, StackResult};

/// Minimum number of AZs that must host an egress-capable private subnet
pub const MIN_PRIVATE_AZS: usize = 2;

/// How a subnet reaches (or does not reach) the internet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubnetKind {
    /// Default route through an internet gateway
    Public,
    /// Default route through a NAT (or other egress) device
    PrivateWithEgress,
    /// No default route
    Isolated,
}

impl fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetKind::Public => write!(f, "public"),
            SubnetKind::PrivateWithEgress => write!(f, "private"),
            SubnetKind::Isolated => write!(f, "isolated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetInfo {
    /// Cloud subnet id for looked-up VPCs, logical resource name for declared ones
    pub subnet_id: String,
    pub availability_zone: String,
    pub kind: SubnetKind,
}

impl SubnetInfo {
    pub fn new(
        subnet_id: impl Into<String>,
        availability_zone: impl Into<String>,
        kind: SubnetKind,
    ) -> Self {
        Self {
            subnet_id: subnet_id.into(),
            availability_zone: availability_zone.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpcTopology {
    pub subnets: Vec<SubnetInfo>,
}

impl VpcTopology {
    pub fn new(subnets: Vec<SubnetInfo>) -> Self {
        Self { subnets }
    }

    pub fn subnets_of(&self, kind: SubnetKind) -> impl Iterator<Item = &SubnetInfo> {
        self.subnets.iter().filter(move |s| s.kind == kind)
    }

    pub fn count(&self, kind: SubnetKind) -> usize {
        self.subnets_of(kind).count()
    }

    /// First subnet of `kind` in each AZ, ordered by AZ name
    pub fn one_per_az(&self, kind: SubnetKind) -> Vec<&SubnetInfo> {
        let mut by_az: BTreeMap<&str, &SubnetInfo> = BTreeMap::new();
        for subnet in self.subnets_of(kind) {
            by_az.entry(subnet.availability_zone.as_str()).or_insert(subnet);
        }
        by_az.into_values().collect()
    }
}

/// Check that private subnets span enough AZs.
///
/// Logs a summary of the subnet counts first and returns the number of
/// distinct AZs hosting a private subnet.
pub fn validate_topology(topology: &VpcTopology) -> StackResult<usize> {
    let private_azs = topology.one_per_az(SubnetKind::PrivateWithEgress).len();

    log::info!(
        "Detected VPC with {} private subnets, {} public subnets, and {} isolated subnets",
        topology.count(SubnetKind::PrivateWithEgress),
        topology.count(SubnetKind::Public),
        topology.count(SubnetKind::Isolated)
    );

    if private_azs < MIN_PRIVATE_AZS {
        return Err(StackError::InsufficientAvailabilityZones {
            detected: private_azs,
        });
    }
    Ok(private_azs)
}
