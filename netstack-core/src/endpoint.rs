//! Endpoint - Normalize user-supplied cluster endpoints
//!
//! Endpoints are published for sibling stacks in the canonical form
//! `scheme://host:port`, with the default port spelled out.

use url::Url;

use crate::error::{StackError, StackResult};

/// Validate an http(s) endpoint and return it as `scheme://host:port`.
///
/// The port is always explicit: 80 for http and 443 for https when the input
/// omits it. The path must be root; query strings, fragments and credentials
/// are rejected since they cannot be carried by the canonical form.
pub fn normalize_endpoint(endpoint: &str) -> StackResult<String> {
    let url = Url::parse(endpoint)
        .map_err(|e| StackError::invalid_endpoint(endpoint, format!("not a valid URL ({})", e)))?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(StackError::invalid_endpoint(
            endpoint,
            format!("invalid protocol '{}', expecting 'http' or 'https'", scheme),
        ));
    }

    if url.path() != "/" {
        return Err(StackError::invalid_endpoint(
            endpoint,
            format!("must not contain a path: {}", url.path()),
        ));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(StackError::invalid_endpoint(
            endpoint,
            "must not contain a query or fragment",
        ));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(StackError::invalid_endpoint(
            endpoint,
            "must not contain credentials",
        ));
    }

    let host = url
        .host_str()
        .ok_or_else(|| StackError::invalid_endpoint(endpoint, "missing host"))?;

    // Url::port() hides the scheme's default port, port_or_known_default() restores it
    let port = url
        .port_or_known_default()
        .ok_or_else(|| StackError::invalid_endpoint(endpoint, "missing port"))?;

    Ok(format!("{}://{}:{}", scheme, host, port))
}
