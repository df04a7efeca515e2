//! Errors raised while declaring the network stack
//!
//! Every variant is a configuration problem the operator has to fix before
//! re-running; none of them is retried.

use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Required vpcAZCount is 2 or 3 but received: {0}")]
    InvalidAzCount(i64),

    #[error(
        "Not enough AZs ({detected} unique AZs detected) used for private subnets to meet 2 or 3 AZ requirement"
    )]
    InsufficientAvailabilityZones { detected: usize },

    #[error("Capture Proxy ESService, Elasticsearch Service, or SourceClusterEndpoint must be enabled")]
    MissingSourceCluster,

    #[error("SSM parameter '{0}' was not found")]
    MissingParameter(String),

    #[error("Target group name '{name}' is invalid: {reason}")]
    InvalidTargetGroupName { name: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lookup failed: {0}")]
    Lookup(#[from] ProviderError),
}

impl StackError {
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

pub type StackResult<T> = Result<T, StackError>;
