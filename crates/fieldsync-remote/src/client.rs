//! REST client for the remote record store
//!
//! Provides a typed HTTP client for a REST-style record API with one JSON
//! collection per entity kind. Handles authentication headers, JSON
//! deserialization, and created-id extraction.
//!
//! ## Endpoint shape
//!
//! | Operation | Request                         |
//! |-----------|---------------------------------|
//! | list      | `GET {base}/{kind}`             |
//! | create    | `POST {base}/{kind}`            |
//! | update    | `PATCH {base}/{kind}/{id}`      |
//! | delete    | `DELETE {base}/{kind}/{id}`     |
//!
//! List responses may be either a bare JSON array or an object with a
//! `value` array (OData-style envelope). Create responses may carry the new
//! id in a `Location` header, an `OData-EntityId` header, or an `id` field
//! in the response body.

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use fieldsync_core::domain::record::Fields;
use fieldsync_core::domain::{EntityKind, RecordId};
use fieldsync_core::ports::{IRemoteStore, RemoteRecord};

// ============================================================================
// RestRemoteStore
// ============================================================================

/// HTTP client for the remote record store
///
/// Wraps `reqwest::Client` with bearer authentication and collection URL
/// construction. One instance serves all entity kinds under a base URL.
pub struct RestRemoteStore {
    /// The underlying HTTP client
    client: Client,
    /// Base URL, without a trailing slash
    base_url: String,
}

impl RestRemoteStore {
    /// Creates a new client for the record store at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    fn request(&self, method: Method, token: &str, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url).bearer_auth(token)
    }

    fn collection_path(kind: &EntityKind) -> String {
        format!("/{}", kind.as_str())
    }

    fn item_path(kind: &EntityKind, id: &RecordId) -> String {
        format!("/{}/{}", kind.as_str(), id.as_str())
    }
}

// ============================================================================
// Response parsing helpers
// ============================================================================

/// Unwraps a list response into its item array
///
/// Accepts a bare array or an OData-style `{"value": [...]}` envelope.
fn collection_items(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("value") {
            Some(Value::Array(items)) => Ok(items),
            _ => anyhow::bail!("List response object has no 'value' array"),
        },
        other => anyhow::bail!("Unexpected list response shape: {}", other),
    }
}

/// Maps a single list item to a RemoteRecord
///
/// The `id` field is lifted out of the attribute map; items without one are
/// rejected so the caller can skip them.
fn remote_record_from_item(item: Value) -> Result<RemoteRecord> {
    let Value::Object(mut fields) = item else {
        anyhow::bail!("List item is not a JSON object");
    };

    let id_value = fields
        .remove("id")
        .context("List item has no 'id' field")?;
    let id_str = id_value
        .as_str()
        .context("List item 'id' is not a string")?;
    let id = RecordId::new(id_str).context("List item 'id' is invalid")?;

    Ok(RemoteRecord { id, fields })
}

/// Extracts the created record's id from an entity-address URL
///
/// Handles both plain REST addresses (`.../participants/abc-123`) and
/// OData-style ones (`.../participants(abc-123)` with optional quotes).
pub(crate) fn extract_created_id(entity_url: &str) -> Option<String> {
    let path = match url::Url::parse(entity_url) {
        Ok(parsed) => parsed.path().to_string(),
        // Relative Location headers are allowed
        Err(_) => entity_url.to_string(),
    };

    let segment = path.rsplit('/').find(|s| !s.is_empty())?;

    let id = match segment.find('(') {
        Some(open) if segment.ends_with(')') => {
            segment[open + 1..segment.len() - 1].trim_matches('\'')
        }
        _ => segment,
    };

    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

// ============================================================================
// IRemoteStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IRemoteStore for RestRemoteStore {
    async fn list(&self, token: &str, kind: &EntityKind) -> Result<Vec<RemoteRecord>> {
        let path = Self::collection_path(kind);
        debug!(kind = %kind, "Fetching remote collection");

        let body: Value = self
            .request(Method::GET, token, &path)
            .send()
            .await
            .with_context(|| format!("Failed to fetch collection {}", kind))?
            .error_for_status()
            .with_context(|| format!("GET {} returned error status", path))?
            .json()
            .await
            .with_context(|| format!("Failed to parse {} list response", kind))?;

        let items = collection_items(body)?;
        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match remote_record_from_item(item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Skipping malformed list item");
                }
            }
        }

        debug!(kind = %kind, count = records.len(), "Fetched remote collection");
        Ok(records)
    }

    async fn create(&self, token: &str, kind: &EntityKind, fields: &Fields) -> Result<RecordId> {
        let path = Self::collection_path(kind);
        debug!(kind = %kind, "Creating remote record");

        let response = self
            .request(Method::POST, token, &path)
            .json(fields)
            .send()
            .await
            .with_context(|| format!("Failed to POST to collection {}", kind))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("POST {} returned {}: {}", path, status, body);
        }

        // Prefer the address headers; fall back to an id in the body
        let header_id = ["location", "odata-entityid"]
            .iter()
            .filter_map(|name| response.headers().get(*name))
            .filter_map(|v| v.to_str().ok())
            .find_map(extract_created_id);

        let id_str = match header_id {
            Some(id) => id,
            None => {
                let body: Value = response
                    .json()
                    .await
                    .context("Create response has no address header and no JSON body")?;
                body.get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .context("Create response carries no record id")?
            }
        };

        let id = RecordId::new(id_str).context("Server-issued id is invalid")?;
        debug!(kind = %kind, id = %id, "Created remote record");
        Ok(id)
    }

    async fn update(
        &self,
        token: &str,
        kind: &EntityKind,
        id: &RecordId,
        fields: &Fields,
    ) -> Result<()> {
        let path = Self::item_path(kind, id);
        debug!(kind = %kind, id = %id, "Updating remote record");

        self.request(Method::PATCH, token, &path)
            .json(fields)
            .send()
            .await
            .with_context(|| format!("Failed to PATCH {}", path))?
            .error_for_status()
            .with_context(|| format!("PATCH {} returned error status", path))?;

        Ok(())
    }

    async fn delete(&self, token: &str, kind: &EntityKind, id: &RecordId) -> Result<()> {
        let path = Self::item_path(kind, id);
        debug!(kind = %kind, id = %id, "Deleting remote record");

        let response = self
            .request(Method::DELETE, token, &path)
            .send()
            .await
            .with_context(|| format!("Failed to DELETE {}", path))?;

        // Already gone counts as deleted
        if response.status() == StatusCode::NOT_FOUND {
            debug!(kind = %kind, id = %id, "Remote record already absent");
            return Ok(());
        }

        response
            .error_for_status()
            .with_context(|| format!("DELETE {} returned error status", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn participants() -> EntityKind {
        EntityKind::new("participants").unwrap()
    }

    // ------------------------------------------------------------------
    // Pure helpers
    // ------------------------------------------------------------------

    #[test]
    fn test_extract_created_id_plain_rest() {
        assert_eq!(
            extract_created_id("https://api.example.com/participants/abc-123").as_deref(),
            Some("abc-123")
        );
    }

    #[test]
    fn test_extract_created_id_odata_parens() {
        assert_eq!(
            extract_created_id("https://api.example.com/data/participants(f4e2)").as_deref(),
            Some("f4e2")
        );
        assert_eq!(
            extract_created_id("https://api.example.com/data/participants('f4e2')").as_deref(),
            Some("f4e2")
        );
    }

    #[test]
    fn test_extract_created_id_relative_and_trailing_slash() {
        assert_eq!(
            extract_created_id("/participants/abc-123/").as_deref(),
            Some("abc-123")
        );
    }

    #[test]
    fn test_extract_created_id_rejects_empty() {
        assert_eq!(extract_created_id(""), None);
        assert_eq!(extract_created_id("https://api.example.com/"), None);
    }

    #[test]
    fn test_base_url_trailing_slash_is_stripped() {
        let client = RestRemoteStore::new("https://api.example.com/data/");
        assert_eq!(client.base_url(), "https://api.example.com/data");
    }

    // ------------------------------------------------------------------
    // HTTP behaviour
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_parses_value_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/participants"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"id": "p-1", "name": "Alex"},
                    {"id": "p-2", "name": "Sam"}
                ]
            })))
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        let records = client.list("tok-1", &participants()).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_str(), "p-1");
        assert_eq!(records[0].fields["name"], json!("Alex"));
        // The id was lifted out of the attribute map
        assert!(!records[0].fields.contains_key("id"));
    }

    #[tokio::test]
    async fn test_list_parses_bare_array_and_skips_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/participants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "p-1", "name": "Alex"},
                {"name": "no id here"}
            ])))
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        let records = client.list("tok", &participants()).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "p-1");
    }

    #[tokio::test]
    async fn test_list_propagates_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/participants"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        assert!(client.list("tok", &participants()).await.is_err());
    }

    #[tokio::test]
    async fn test_create_reads_location_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/participants"))
            .and(body_json(json!({"name": "Alex"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", "/participants/srv-42"),
            )
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        let fields = json!({"name": "Alex"}).as_object().cloned().unwrap();
        let id = client
            .create("tok", &participants(), &fields)
            .await
            .unwrap();
        assert_eq!(id.as_str(), "srv-42");
    }

    #[tokio::test]
    async fn test_create_reads_odata_entityid_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/participants"))
            .respond_with(ResponseTemplate::new(204).insert_header(
                "OData-EntityId",
                "https://api.example.com/data/participants(srv-42)",
            ))
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        let id = client
            .create("tok", &participants(), &Fields::new())
            .await
            .unwrap();
        assert_eq!(id.as_str(), "srv-42");
    }

    #[tokio::test]
    async fn test_create_falls_back_to_body_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/participants"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "srv-42", "name": "Alex"})),
            )
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        let id = client
            .create("tok", &participants(), &Fields::new())
            .await
            .unwrap();
        assert_eq!(id.as_str(), "srv-42");
    }

    #[tokio::test]
    async fn test_create_fails_without_any_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/participants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        assert!(client
            .create("tok", &participants(), &Fields::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_update_patches_item_path() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/participants/srv-42"))
            .and(header("authorization", "Bearer tok-1"))
            .and(body_json(json!({"name": "Alexandra"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        let fields = json!({"name": "Alexandra"}).as_object().cloned().unwrap();
        client
            .update(
                "tok-1",
                &participants(),
                &RecordId::new("srv-42").unwrap(),
                &fields,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_record() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/participants/srv-42"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        client
            .delete("tok", &participants(), &RecordId::new("srv-42").unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_propagates_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/participants/srv-42"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = RestRemoteStore::new(server.uri());
        assert!(client
            .delete("tok", &participants(), &RecordId::new("srv-42").unwrap())
            .await
            .is_err());
    }
}
