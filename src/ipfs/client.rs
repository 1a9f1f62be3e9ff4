// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pinata pinning API client with public gateway reads.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

use super::cache::ContentCache;
use crate::config::{AppConfig, PinataConfig};

/// Timeout for pinning API calls.
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-gateway timeout for content reads.
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

const API_KEY_HEADER: &str = "pinata_api_key";
const SECRET_KEY_HEADER: &str = "pinata_secret_api_key";

#[derive(Debug, thiserror::Error)]
pub enum IpfsError {
    #[error("IPFS pinning service not configured")]
    NotConfigured,

    #[error("IPFS upload failed: {0}")]
    Upload(String),

    #[error("IPFS retrieval failed: {0}")]
    Retrieval(String),

    #[error("Pinning API error: {0}")]
    Api(String),
}

/// Pinned item as listed by the pinning service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PinnedItem {
    pub ipfs_hash: String,
    pub size: u64,
    pub date_pinned: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct PinJsonResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Deserialize)]
struct PinListResponse {
    #[serde(default)]
    rows: Vec<PinListRow>,
}

#[derive(Deserialize)]
struct PinListRow {
    ipfs_pin_hash: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    date_pinned: String,
    #[serde(default)]
    metadata: Option<PinListMetadata>,
}

#[derive(Deserialize)]
struct PinListMetadata {
    name: Option<String>,
}

#[derive(Clone)]
struct Credentials {
    api_key: String,
    secret_api_key: String,
}

/// Client for the pinning service and public IPFS gateways.
///
/// Gateway reads work without pinning credentials; uploads and pin
/// management fail with [`IpfsError::NotConfigured`].
pub struct PinataClient {
    api_url: String,
    credentials: Option<Credentials>,
    gateways: Vec<String>,
    http: Client,
    cache: ContentCache,
}

impl PinataClient {
    pub fn new(pinata: Option<&PinataConfig>, gateways: Vec<String>) -> Result<Self, IpfsError> {
        let http = Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .map_err(|e| IpfsError::Api(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_url: pinata
                .map(|p| p.api_url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            credentials: pinata.map(|p| Credentials {
                api_key: p.api_key.clone(),
                secret_api_key: p.secret_api_key.clone(),
            }),
            gateways: gateways
                .into_iter()
                .map(|g| g.trim_end_matches('/').to_string())
                .collect(),
            http,
            cache: ContentCache::default(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, IpfsError> {
        Self::new(config.pinata.as_ref(), config.ipfs_gateways.clone())
    }

    /// Whether pinning credentials are present.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    fn credentials(&self) -> Result<&Credentials, IpfsError> {
        self.credentials.as_ref().ok_or(IpfsError::NotConfigured)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, IpfsError> {
        let creds = self.credentials()?;
        Ok(builder
            .header(API_KEY_HEADER, &creds.api_key)
            .header(SECRET_KEY_HEADER, &creds.secret_api_key))
    }

    // =========================================================================
    // Pinning
    // =========================================================================

    /// Pin a JSON document and return its CID.
    pub async fn upload_json(
        &self,
        content: &Value,
        name: &str,
        keyvalues: Map<String, Value>,
    ) -> Result<String, IpfsError> {
        let body = json!({
            "pinataContent": content,
            "pinataMetadata": { "name": name, "keyvalues": keyvalues },
            "pinataOptions": { "cidVersion": 1 },
        });

        let request = self.authed(
            self.http
                .post(format!("{}/pinning/pinJSONToIPFS", self.api_url))
                .json(&body),
        )?;
        let response = request
            .send()
            .await
            .map_err(|e| IpfsError::Upload(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IpfsError::Upload(format!("pinJSONToIPFS returned {status}: {body}")));
        }

        let pinned: PinJsonResponse = response
            .json()
            .await
            .map_err(|e| IpfsError::Upload(format!("invalid response: {e}")))?;

        tracing::debug!(cid = %pinned.ipfs_hash, name, "Pinned JSON document");
        Ok(pinned.ipfs_hash)
    }

    /// Pin a verifiable credential, tagged with its credential id.
    pub async fn upload_credential(&self, vc: &Value, credential_id: &str) -> Result<String, IpfsError> {
        let mut keyvalues = Map::new();
        keyvalues.insert("type".into(), Value::String("academic-credential".into()));
        keyvalues.insert("credentialId".into(), Value::String(credential_id.to_string()));
        self.upload_json(vc, &format!("credential-{credential_id}.json"), keyvalues)
            .await
    }

    /// Ask the pinning service to pin existing content.
    pub async fn pin_by_hash(&self, cid: &str, name: &str) -> Result<(), IpfsError> {
        let body = json!({
            "hashToPin": cid,
            "pinataMetadata": { "name": name },
        });
        let response = self
            .authed(
                self.http
                    .post(format!("{}/pinning/pinByHash", self.api_url))
                    .json(&body),
            )?
            .send()
            .await
            .map_err(|e| IpfsError::Api(format!("pinByHash failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IpfsError::Api(format!("pinByHash returned {status}: {body}")));
        }
        Ok(())
    }

    /// List currently pinned items.
    pub async fn list_pins(&self, limit: u32) -> Result<Vec<PinnedItem>, IpfsError> {
        let response = self
            .authed(self.http.get(format!("{}/data/pinList", self.api_url)).query(&[
                ("status", "pinned".to_string()),
                ("pageLimit", limit.to_string()),
            ]))?
            .send()
            .await
            .map_err(|e| IpfsError::Api(format!("pinList failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IpfsError::Api(format!("pinList returned {status}: {body}")));
        }

        let list: PinListResponse = response
            .json()
            .await
            .map_err(|e| IpfsError::Api(format!("invalid pinList response: {e}")))?;

        Ok(list
            .rows
            .into_iter()
            .map(|row| PinnedItem {
                ipfs_hash: row.ipfs_pin_hash,
                size: row.size,
                date_pinned: row.date_pinned,
                name: row.metadata.and_then(|m| m.name),
            })
            .collect())
    }

    /// Probe the pinning credentials. Never errors.
    pub async fn test_connection(&self) -> bool {
        let Ok(request) = self.authed(self.http.get(format!("{}/data/testAuthentication", self.api_url))) else {
            return false;
        };
        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Pinning service probe failed");
                false
            }
        }
    }

    // =========================================================================
    // Gateway reads
    // =========================================================================

    /// Fetch a JSON document, trying each gateway in order.
    pub async fn get_credential(&self, cid: &str) -> Result<Value, IpfsError> {
        if let Some(cached) = self.cache.get(cid) {
            return Ok(cached);
        }

        let mut failures = Vec::new();
        for gateway in &self.gateways {
            let url = format!("{gateway}/{cid}");
            let result = self.http.get(&url).timeout(GATEWAY_TIMEOUT).send().await;
            match result {
                Ok(response) if response.status().is_success() => match response.json::<Value>().await {
                    Ok(content) => {
                        tracing::debug!(cid, gateway = %gateway, "Fetched IPFS content");
                        self.cache.put(cid, content.clone());
                        return Ok(content);
                    }
                    Err(e) => failures.push(format!("{gateway}: invalid JSON: {e}")),
                },
                Ok(response) => failures.push(format!("{gateway}: HTTP {}", response.status())),
                Err(e) => failures.push(format!("{gateway}: {e}")),
            }
        }

        tracing::warn!(cid, attempts = failures.len(), "All IPFS gateways failed");
        Err(IpfsError::Retrieval(if failures.is_empty() {
            "no gateways configured".to_string()
        } else {
            failures.join("; ")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pinata(server: &MockServer) -> PinataConfig {
        PinataConfig {
            api_url: server.uri(),
            api_key: "key".into(),
            secret_api_key: "secret".into(),
        }
    }

    #[tokio::test]
    async fn upload_sends_metadata_and_returns_cid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pinning/pinJSONToIPFS"))
            .and(header("pinata_api_key", "key"))
            .and(header("pinata_secret_api_key", "secret"))
            .and(body_partial_json(json!({
                "pinataMetadata": {
                    "name": "credential-abc.json",
                    "keyvalues": {"credentialId": "abc", "type": "academic-credential"}
                },
                "pinataOptions": {"cidVersion": 1}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IpfsHash": "bafybeicid",
                "PinSize": 120,
                "Timestamp": "2026-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PinataClient::new(Some(&pinata(&server)), vec![]).unwrap();
        let cid = client.upload_credential(&json!({"id": "urn:uuid:x"}), "abc").await.unwrap();
        assert_eq!(cid, "bafybeicid");
    }

    #[tokio::test]
    async fn upload_error_carries_upstream_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pinning/pinJSONToIPFS"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let client = PinataClient::new(Some(&pinata(&server)), vec![]).unwrap();
        let err = client.upload_json(&json!({}), "x", Map::new()).await.unwrap_err();
        match err {
            IpfsError::Upload(msg) => assert!(msg.contains("invalid key"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn upload_without_credentials_is_not_configured() {
        let client = PinataClient::new(None, vec![]).unwrap();
        assert!(!client.is_configured());
        assert!(matches!(
            client.upload_json(&json!({}), "x", Map::new()).await,
            Err(IpfsError::NotConfigured)
        ));
        assert!(!client.test_connection().await);
    }

    #[tokio::test]
    async fn gateway_fallback_uses_next_gateway_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/first/bafycid"))
            .respond_with(ResponseTemplate::new(504))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/second/bafycid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": ["VerifiableCredential"]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = PinataClient::new(
            None,
            vec![format!("{}/first/", server.uri()), format!("{}/second", server.uri())],
        )
        .unwrap();

        let content = client.get_credential("bafycid").await.unwrap();
        assert_eq!(content["type"][0], "VerifiableCredential");

        // Served from cache; the mocks' expect(1) would fail otherwise
        let again = client.get_credential("bafycid").await.unwrap();
        assert_eq!(again, content);
    }

    #[tokio::test]
    async fn all_gateways_failing_is_retrieval_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = PinataClient::new(None, vec![format!("{}/ipfs", server.uri())]).unwrap();
        assert!(matches!(
            client.get_credential("bafymissing").await,
            Err(IpfsError::Retrieval(_))
        ));
    }

    #[tokio::test]
    async fn list_pins_maps_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/pinList"))
            .and(query_param("status", "pinned"))
            .and(query_param("pageLimit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "rows": [{
                    "id": "row-1",
                    "ipfs_pin_hash": "bafy1",
                    "size": 321,
                    "date_pinned": "2026-01-01T00:00:00Z",
                    "metadata": {"name": "credential-1.json", "keyvalues": null}
                }]
            })))
            .mount(&server)
            .await;

        let client = PinataClient::new(Some(&pinata(&server)), vec![]).unwrap();
        let pins = client.list_pins(5).await.unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].ipfs_hash, "bafy1");
        assert_eq!(pins[0].name.as_deref(), Some("credential-1.json"));
    }

    #[tokio::test]
    async fn pin_by_hash_and_test_connection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pinning/pinByHash"))
            .and(body_partial_json(json!({"hashToPin": "bafy1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "prechecking"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/testAuthentication"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Congratulations!"})))
            .mount(&server)
            .await;

        let client = PinataClient::new(Some(&pinata(&server)), vec![]).unwrap();
        client.pin_by_hash("bafy1", "repin").await.unwrap();
        assert!(client.test_connection().await);
    }
}
