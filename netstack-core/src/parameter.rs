//! Parameter - SSM parameters shared with sibling migration stacks

use std::fmt;

/// Parameters this stack publishes or reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationParameter {
    AlbMigrationUrl,
    OsAccessSecurityGroupId,
    OsClusterEndpoint,
    SourceClusterEndpoint,
    VpcId,
}

impl MigrationParameter {
    /// Key used in the parameter path
    pub fn key(&self) -> &'static str {
        match self {
            MigrationParameter::AlbMigrationUrl => "albMigrationUrl",
            MigrationParameter::OsAccessSecurityGroupId => "osAccessSecurityGroupId",
            MigrationParameter::OsClusterEndpoint => "osClusterEndpoint",
            MigrationParameter::SourceClusterEndpoint => "sourceClusterEndpoint",
            MigrationParameter::VpcId => "vpcId",
        }
    }

    /// Logical name of the ssm_parameter resource publishing this parameter
    pub fn resource_name(&self) -> String {
        let key = self.key();
        let mut chars = key.chars();
        match chars.next() {
            Some(first) => format!("SSMParameter{}{}", first.to_uppercase(), chars.as_str()),
            None => "SSMParameter".to_string(),
        }
    }
}

impl fmt::Display for MigrationParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Full parameter name: `/migration/{stage}/{deploy_id}/{parameter}`
pub fn parameter_name(stage: &str, deploy_id: &str, parameter: MigrationParameter) -> String {
    format!("/migration/{}/{}/{}", stage, deploy_id, parameter.key())
}
