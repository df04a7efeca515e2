//! Self-signed ALB certificates imported into ACM
//!
//! Declared when no listener certificate ARN is configured. The key pair is
//! generated locally for the ALB's private domain; an update re-imports a
//! fresh certificate under the same ARN so listeners keep their reference.

use std::collections::HashMap;

use aws_sdk_acm::primitives::Blob;
use netstack_core::provider::{ProviderError, ProviderResult};
use netstack_core::resource::{Resource, ResourceId, State, Value};
use rcgen::{CertificateParams, DnType, KeyPair};

use crate::provider::AwsProvider;

/// PEM-encoded certificate and its private key
#[derive(Debug, Clone)]
pub struct SelfSignedCertificate {
    pub certificate_pem: String,
    pub private_key_pem: String,
}

/// Generate a certificate for `domain_name`, used as both subject CN and SAN
pub fn generate_self_signed(domain_name: &str) -> ProviderResult<SelfSignedCertificate> {
    let failed = |e: rcgen::Error| {
        ProviderError::new(format!(
            "Failed to generate certificate for {}: {}",
            domain_name, e
        ))
    };

    let mut params = CertificateParams::new(vec![domain_name.to_string()]).map_err(failed)?;
    params
        .distinguished_name
        .push(DnType::CommonName, domain_name);
    let key_pair = KeyPair::generate().map_err(failed)?;
    let certificate = params.self_signed(&key_pair).map_err(failed)?;

    Ok(SelfSignedCertificate {
        certificate_pem: certificate.pem(),
        private_key_pem: key_pair.serialize_pem(),
    })
}

fn domain_name(resource: &Resource) -> ProviderResult<&str> {
    match resource.attributes.get("domain_name") {
        Some(Value::String(domain)) if !domain.is_empty() => Ok(domain),
        _ => Err(ProviderError::new("domain_name is required").for_resource(resource.id.clone())),
    }
}

fn certificate_state(id: &ResourceId, arn: &str, domain_name: Option<&str>) -> State {
    let mut attributes = HashMap::new();
    attributes.insert("certificate_arn".to_string(), Value::string(arn));
    if let Some(domain) = domain_name {
        attributes.insert("domain_name".to_string(), Value::string(domain));
    }
    State::existing(id.clone(), attributes).with_identifier(arn)
}

impl AwsProvider {
    pub async fn read_certificate(&self, id: &ResourceId, arn: &str) -> ProviderResult<State> {
        let result = self
            .acm_client
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await;

        match result {
            Ok(response) => {
                let domain = response.certificate().and_then(|c| c.domain_name());
                Ok(certificate_state(id, arn, domain))
            }
            Err(e) => {
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception())
                {
                    Ok(State::not_found(id.clone()))
                } else {
                    Err(ProviderError::new(format!(
                        "Failed to describe certificate: {:?}",
                        e
                    ))
                    .for_resource(id.clone()))
                }
            }
        }
    }

    /// Import a newly generated certificate, replacing the one at `existing_arn`
    pub async fn import_certificate(
        &self,
        resource: &Resource,
        existing_arn: Option<&str>,
    ) -> ProviderResult<State> {
        let domain = domain_name(resource)?;
        let generated = generate_self_signed(domain).map_err(|e| e.for_resource(resource.id.clone()))?;

        log::info!("Importing self-signed certificate for {}", domain);
        let response = self
            .acm_client
            .import_certificate()
            .certificate(Blob::new(generated.certificate_pem.into_bytes()))
            .private_key(Blob::new(generated.private_key_pem.into_bytes()))
            .set_certificate_arn(existing_arn.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!("Failed to import certificate: {:?}", e))
                    .for_resource(resource.id.clone())
            })?;

        let arn = response
            .certificate_arn()
            .or(existing_arn)
            .ok_or_else(|| {
                ProviderError::new("No certificate ARN returned").for_resource(resource.id.clone())
            })?;
        Ok(certificate_state(&resource.id, arn, Some(domain)))
    }

    pub async fn delete_certificate(&self, id: &ResourceId, arn: &str) -> ProviderResult<()> {
        self.acm_client
            .delete_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!("Failed to delete certificate: {:?}", e))
                    .for_resource(id.clone())
            })?;
        Ok(())
    }
}
