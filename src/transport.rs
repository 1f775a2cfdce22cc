//! Transports to the Hornbill instance.
//!
//! The pipeline talks to the service through the [`Transport`] trait, which
//! offers exactly three operations: upload a file into the session (DAV
//! `PUT`), delete it again (DAV `DELETE`), and invoke an XMLMC method.
//!
//! Two implementations exist:
//!
//! - **[`HttpTransport`]**: real calls over HTTPS with `reqwest::blocking`.
//! - **[`DryRunTransport`]**: logs what would have been sent and returns a
//!   synthetic success. Nothing leaves the machine.
//!
//! Choosing between them is the only place dry-run mode is decided; the
//! pipeline code is identical in both modes.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::xmlmc::{encode_call, flatten, ApiError, Method, Params, Response};

/// Where instance zone information is published.
const ZONEINFO_URL: &str = "https://files.hornbill.com/instances";

/// Request/response access to the document service.
pub trait Transport {
    /// Store `bytes` at `path` inside the caller's session.
    fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), ApiError>;

    /// Remove `path` from the caller's session.
    fn delete(&self, path: &str) -> Result<(), ApiError>;

    /// Call an XMLMC method. Parameters are consumed by the call.
    ///
    /// A `fail` status from the service is returned as
    /// [`ApiError::Method`], so `Ok` always means the call succeeded.
    fn invoke(&self, method: &Method, params: Params) -> Result<Response, ApiError>;
}

// ============ HTTP transport ============

/// XMLMC and DAV over HTTPS, authenticated with an API key.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    api_key: String,
    xmlmc_url: String,
    dav_url: reqwest::Url,
}

#[derive(Debug, Deserialize)]
struct ZoneInfoResponse {
    zoneinfo: ZoneInfo,
}

#[derive(Debug, Deserialize)]
struct ZoneInfo {
    endpoint: String,
}

impl HttpTransport {
    /// Build a transport against a known instance endpoint
    /// (e.g. `https://eurapi.hornbill.com/acme/`).
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .context("Failed to build HTTP client")?;

        let base = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{}/", endpoint)
        };

        let dav_url = reqwest::Url::parse(&format!("{}dav/", base))
            .with_context(|| format!("Invalid instance endpoint: {}", endpoint))?;
        if dav_url.cannot_be_a_base() {
            anyhow::bail!("Invalid instance endpoint: {}", endpoint);
        }

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            xmlmc_url: format!("{}xmlmc/", base),
            dav_url,
        })
    }

    /// Look up the instance endpoint from its zone information, then build
    /// the transport.
    pub fn connect(instance_id: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let endpoint = resolve_endpoint(instance_id, timeout)?;
        info!("Instance {} resolved to {}", instance_id, endpoint);
        Self::new(&endpoint, api_key, timeout)
    }

    /// DAV location of a session path. Each `/`-separated segment is
    /// percent-encoded, so `#`, `?` and `%` in file names stay part of the
    /// name.
    fn dav_target(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let mut url = self.dav_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Encode(format!("{} cannot take a path", self.dav_url)))?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn auth_header(&self) -> String {
        format!("ESP-APIKEY {}", self.api_key)
    }
}

/// Fetch `zoneinfo` for an instance and return its API endpoint.
pub fn resolve_endpoint(instance_id: &str, timeout: Duration) -> Result<String> {
    lookup_zone(ZONEINFO_URL, instance_id, timeout)
}

fn lookup_zone(base: &str, instance_id: &str, timeout: Duration) -> Result<String> {
    let url = format!("{}/{}/zoneinfo", base, instance_id);
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let resp = client
        .get(&url)
        .send()
        .with_context(|| format!("Failed to fetch zone info for instance '{}'", instance_id))?;

    if !resp.status().is_success() {
        anyhow::bail!(
            "Zone info lookup for instance '{}' failed (HTTP {})",
            instance_id,
            resp.status()
        );
    }

    let info: ZoneInfoResponse = resp
        .json()
        .with_context(|| format!("Invalid zone info for instance '{}'", instance_id))?;

    if info.zoneinfo.endpoint.is_empty() {
        anyhow::bail!("Zone info for instance '{}' has no endpoint", instance_id);
    }
    Ok(info.zoneinfo.endpoint)
}

impl Transport for HttpTransport {
    fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), ApiError> {
        let url = self.dav_target(path)?;
        debug!("Destination: {}", url);

        let resp = self
            .client
            .put(url.clone())
            .header("Content-Type", content_type)
            .header("Authorization", self.auth_header())
            .body(bytes)
            .send()
            .map_err(|e| ApiError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ApiError::Status(format!("PUT {}: {}", url, resp.status())));
        }
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.dav_target(path)?;

        let resp = self
            .client
            .delete(url.clone())
            .header("Authorization", self.auth_header())
            .send()
            .map_err(|e| ApiError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ApiError::Status(format!(
                "DELETE {}: {}",
                url,
                resp.status()
            )));
        }
        Ok(())
    }

    fn invoke(&self, method: &Method, params: Params) -> Result<Response, ApiError> {
        debug!("[{}] {}", method, params.render());
        let body = encode_call(method, &params)?;
        let url = format!("{}{}/?method={}", self.xmlmc_url, method.service, method.name);

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "text/xmlmc")
            .header("Accept", "text/xml")
            .header("Authorization", self.auth_header())
            .body(body)
            .send()
            .map_err(|e| ApiError::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().map_err(|e| ApiError::Http(e.to_string()))?;
        debug!("[RESPONSE] {}", flatten(&text));

        // XMLMC reports method failures inside the body, sometimes with a
        // non-2xx status, so only fall back to the status when the body
        // does not decode.
        let response = match Response::parse(&text) {
            Ok(r) => r,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Status(format!("{}: {}", method, status)))
            }
            Err(e) => return Err(e),
        };
        response.into_result(method)
    }
}

// ============ Dry-run transport ============

/// Logs every call it receives and reports success without doing anything.
///
/// Responses carry no parameters, so no document or tag identifiers are
/// ever produced.
#[derive(Debug, Default)]
pub struct DryRunTransport;

impl Transport for DryRunTransport {
    fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), ApiError> {
        info!(
            "[DRYRUN] PUT {} ({} bytes, {})",
            path,
            bytes.len(),
            content_type
        );
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), ApiError> {
        info!("[DRYRUN] DELETE {}", path);
        Ok(())
    }

    fn invoke(&self, method: &Method, params: Params) -> Result<Response, ApiError> {
        info!("[DRYRUN] {}:{}", method, params.render());
        Ok(Response::synthetic_ok())
    }
}
