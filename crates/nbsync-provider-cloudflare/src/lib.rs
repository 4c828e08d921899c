// # Cloudflare Record Store
//
// This crate provides a Cloudflare API v4 implementation of `RecordStore`.
//
// ## Scope
//
// - One HTTP request per trait call
// - Full error propagation to the reconciler (a failed run is retried whole
//   on the next tick; no retry or backoff here)
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401, 403, 404, 429, 5xx)
// - Dry-run mode: reads go out, mutations are only logged
// - No caching between calls: zone and record ids are owned by the run
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Empty token is a configuration error, never a panic
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use nbsync_core::config::StoreConfig;
use nbsync_core::traits::{ExistingRecord, RecordStore, RecordStoreFactory, RecordType, Zone};
use nbsync_core::{Error, Result, StoreRegistry};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for record listings; a single name never has more records
const LIST_PAGE_SIZE: u32 = 100;

/// Standard Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiZone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiDnsRecord {
    id: String,
    name: String,
    content: String,
    #[serde(default)]
    proxied: bool,
}

/// Request body for create and update
#[derive(Debug, Serialize)]
struct RecordPayload<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    proxied: bool,
}

impl From<ApiDnsRecord> for ExistingRecord {
    fn from(record: ApiDnsRecord) -> Self {
        ExistingRecord {
            id: record.id,
            domain: record.name,
            address: record.content,
            proxied: record.proxied,
        }
    }
}

/// Cloudflare record store
///
/// Stateless apart from the HTTP client: every call is a single request.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended POST/PUT/DELETE with its payload
/// - **NOT** actually modify DNS records
pub struct CloudflareStore {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareStore")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareStore {
    /// Create a new Cloudflare store
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `dry_run`: If true, perform reads but only log mutations
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty or the HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Point the store at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
    }

    /// Send a request and unwrap the response envelope
    ///
    /// `operation` names the call in error messages.
    async fn send<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::connectivity("cloudflare", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::connectivity("cloudflare", format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(operation, status, &body));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(Error::store_operation(operation, describe(&envelope.errors)));
        }

        envelope
            .result
            .ok_or_else(|| Error::store_operation(operation, "Invalid response format: missing result"))
    }
}

/// Map a non-2xx status to the matching error class
fn status_error(operation: &str, status: StatusCode, body: &str) -> Error {
    // Cloudflare puts the useful text in the envelope's errors; fall back to the raw body
    let detail = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .map(|envelope| describe(&envelope.errors))
        .unwrap_or_else(|_| body.to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", operation, detail)),
        429 => Error::rate_limited(format!("Cloudflare rate limit exceeded. Status: {}", status)),
        500..=599 => Error::store_operation(
            operation,
            format!("Cloudflare server error (transient): {} - {}", status, detail),
        ),
        _ => Error::store_operation(operation, format!("{} - {}", status, detail)),
    }
}

fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "request was not successful".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl RecordStore for CloudflareStore {
    async fn resolve_zone(&self, domain: &str) -> Result<Zone> {
        tracing::debug!("Looking up zone ID for domain: {}", domain);

        let zones: Vec<ApiZone> = self
            .send(
                "list zones",
                self.request(Method::GET, "/zones").query(&[("name", domain)]),
            )
            .await?;

        let mut matching: Vec<ApiZone> = zones
            .into_iter()
            .filter(|z| z.name.eq_ignore_ascii_case(domain))
            .collect();

        match matching.len() {
            0 => Err(Error::not_found(format!("Zone not found: {}", domain))),
            1 => {
                let zone = matching.remove(0);
                tracing::debug!("Found zone ID: {}", zone.id);
                Ok(Zone::new(zone.id, zone.name))
            }
            n => Err(Error::store_operation(
                "list zones",
                format!("{} zones match {}, expected exactly one", n, domain),
            )),
        }
    }

    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<ExistingRecord>> {
        tracing::debug!("Listing records: {} (type: {})", name, record_type);

        let per_page = LIST_PAGE_SIZE.to_string();
        let records: Vec<ApiDnsRecord> = self
            .send(
                "list records",
                self.request(Method::GET, &format!("/zones/{}/dns_records", zone_id))
                    .query(&[
                        ("name", name),
                        ("type", record_type.as_str()),
                        ("per_page", per_page.as_str()),
                    ]),
            )
            .await?;

        Ok(records.into_iter().map(ExistingRecord::from).collect())
    }

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<String> {
        let payload = RecordPayload {
            record_type: RecordType::A.as_str(),
            name,
            content: address,
            proxied,
        };
        let path = format!("/zones/{}/dns_records", zone_id);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                path,
                serde_json::to_string(&payload)?
            );
            return Ok(format!("dry-run:{}", name));
        }

        let record: ApiDnsRecord = self
            .send("create record", self.request(Method::POST, &path).json(&payload))
            .await?;
        Ok(record.id)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<()> {
        let payload = RecordPayload {
            record_type: RecordType::A.as_str(),
            name,
            content: address,
            proxied,
        };
        let path = format!("/zones/{}/dns_records/{}", zone_id, record_id);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                path,
                serde_json::to_string(&payload)?
            );
            return Ok(());
        }

        let _: ApiDnsRecord = self
            .send("update record", self.request(Method::PUT, &path).json(&payload))
            .await?;
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let path = format!("/zones/{}/dns_records/{}", zone_id, record_id);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", path);
            return Ok(());
        }

        let _: serde_json::Value = self
            .send("delete record", self.request(Method::DELETE, &path))
            .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare stores
pub struct CloudflareFactory;

impl RecordStoreFactory for CloudflareFactory {
    fn create(&self, config: &StoreConfig) -> Result<Box<dyn RecordStore>> {
        match config {
            StoreConfig::Cloudflare { api_token, dry_run } => {
                if *dry_run {
                    tracing::warn!("Cloudflare store running in DRY-RUN mode - no changes will be made");
                }
                Ok(Box::new(CloudflareStore::new(api_token.clone(), *dry_run)?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare store")),
        }
    }
}

/// Register the Cloudflare store with a registry
///
/// # Example
///
/// ```rust
/// use nbsync_core::StoreRegistry;
///
/// let registry = StoreRegistry::with_builtin();
/// nbsync_provider_cloudflare::register(&registry);
/// assert!(registry.has_store("cloudflare"));
/// ```
pub fn register(registry: &StoreRegistry) {
    registry.register_store("cloudflare", Box::new(CloudflareFactory));
}
