// # Netbird Peer Source
//
// This crate provides a `PeerSource` backed by the Netbird management API.
//
// ## Request
//
// One `GET <endpoint>/api/peers` per run:
//
// ```http
// GET /api/peers
// Accept: application/json
// Authorization: Token <access token>
// ```
//
// The response is a JSON array of peers. Only `dns_label` and `ip` are
// required; every other field is optional so schema drift upstream does not
// break parsing.
//
// ## Security Requirements
//
// - Access token NEVER appears in logs or `Debug` output

use nbsync_core::traits::{Peer, PeerSource};
use nbsync_core::{Error, Result};
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Peer listing path, relative to the management endpoint
const PEERS_PATH: &str = "/api/peers";

/// Netbird management API peer source
pub struct NetbirdPeerSource {
    /// Management endpoint, e.g. "https://api.netbird.io", without trailing `/`
    endpoint: String,

    /// Personal access token
    /// ⚠️ NEVER log this value
    access_token: String,

    /// HTTP client
    client: reqwest::Client,
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for NetbirdPeerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetbirdPeerSource")
            .field("endpoint", &self.endpoint)
            .field("access_token", &"<REDACTED>")
            .finish()
    }
}

impl NetbirdPeerSource {
    /// Create a new Netbird peer source
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Management API base URL (a trailing `/` is tolerated)
    /// - `access_token`: Personal access token with peer read permission
    ///
    /// # Errors
    ///
    /// `Error::Config` if either argument is empty or the HTTP client cannot
    /// be built.
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let access_token = access_token.into();

        if endpoint.is_empty() {
            return Err(Error::config("Netbird endpoint cannot be empty"));
        }
        if access_token.is_empty() {
            return Err(Error::config("Netbird access token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            access_token,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn peers_url(&self) -> String {
        format!("{}{}", self.endpoint, PEERS_PATH)
    }
}

#[async_trait::async_trait]
impl PeerSource for NetbirdPeerSource {
    async fn fetch_peers(&self) -> Result<Vec<Peer>> {
        let url = self.peers_url();
        tracing::debug!("Fetching peers from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Token {}", self.access_token))
            .send()
            .await
            .map_err(|e| Error::connectivity("netbird", format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::connectivity(
                "netbird",
                format!("HTTP error: {} {}", status, body.trim()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::connectivity("netbird", format!("Failed to read response: {}", e)))?;

        let peers: Vec<Peer> = serde_json::from_str(&body)?;
        tracing::debug!("Netbird returned {} peer(s)", peers.len());
        Ok(peers)
    }

    fn source_name(&self) -> &'static str {
        "netbird"
    }
}
