//! Config - Deployment options for one network stack
//!
//! Read from a JSON file using the camelCase keys of the migration
//! deployment context. Values are immutable once loaded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::error::{StackError, StackResult};

/// Default file the CLI reads props from
pub const DEFAULT_CONFIG_FILE: &str = "netstack.json";

/// AZ count used when a new VPC is created without `vpcAZCount`
pub const DEFAULT_AZ_COUNT: u8 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkStackProps {
    pub stage: String,
    #[serde(deserialize_with = "empty_as_none")]
    pub region: Option<String>,
    pub default_deploy_id: String,
    #[serde(deserialize_with = "empty_as_none")]
    pub add_on_migration_deploy_id: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub vpc_id: Option<String>,
    /// Any integer; `validate` accepts only 2 or 3
    #[serde(rename = "vpcAZCount")]
    pub vpc_az_count: Option<i64>,
    pub elasticsearch_service_enabled: bool,
    #[serde(rename = "captureProxyESServiceEnabled")]
    pub capture_proxy_es_service_enabled: bool,
    #[serde(deserialize_with = "empty_as_none")]
    pub source_cluster_endpoint: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub target_cluster_endpoint: Option<String>,
    pub alb_enabled: bool,
    #[serde(deserialize_with = "empty_as_none")]
    pub alb_acm_cert_arn: Option<String>,
}

impl Default for NetworkStackProps {
    fn default() -> Self {
        Self {
            stage: String::new(),
            region: None,
            default_deploy_id: "default".to_string(),
            add_on_migration_deploy_id: None,
            vpc_id: None,
            vpc_az_count: None,
            elasticsearch_service_enabled: false,
            capture_proxy_es_service_enabled: false,
            source_cluster_endpoint: None,
            target_cluster_endpoint: None,
            alb_enabled: false,
            alb_acm_cert_arn: None,
        }
    }
}

impl NetworkStackProps {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Default::default()
        }
    }

    /// Check values that are invalid regardless of which resources get declared
    pub fn validate(&self) -> StackResult<()> {
        if self.stage.trim().is_empty() {
            return Err(StackError::InvalidConfig("stage must not be empty".to_string()));
        }
        if self.default_deploy_id.trim().is_empty() {
            return Err(StackError::InvalidConfig(
                "defaultDeployId must not be empty".to_string(),
            ));
        }
        if let Some(count) = self.vpc_az_count
            && count != 2
            && count != 3
        {
            return Err(StackError::InvalidAzCount(count));
        }
        Ok(())
    }

    /// Number of AZs for a newly created VPC
    pub fn az_count(&self) -> u8 {
        self.vpc_az_count
            .and_then(|count| u8::try_from(count).ok())
            .unwrap_or(DEFAULT_AZ_COUNT)
    }

    /// True when an Elasticsearch source or capture proxy runs inside the deployment
    pub fn source_service_enabled(&self) -> bool {
        self.elasticsearch_service_enabled || self.capture_proxy_es_service_enabled
    }

    pub fn is_add_on(&self) -> bool {
        self.add_on_migration_deploy_id.is_some()
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Load props from a JSON file
pub fn load_props(path: &Path) -> Result<NetworkStackProps, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_props(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse props from JSON text
pub fn parse_props(content: &str) -> Result<NetworkStackProps, serde_json::Error> {
    serde_json::from_str(content)
}
