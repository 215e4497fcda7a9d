//! Integration tests for the coffee catalog API.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and start the server against a scratch database
//! cargo run -p coffee-catalog-cli -- migrate
//! cargo run -p coffee-catalog-api
//!
//! # Run the ignored tests
//! cargo test -p coffee-catalog-integration-tests -- --ignored
//! ```
//!
//! Tests create their own tags and coffees under unique names, so they can
//! run against a catalog that already holds data.

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the catalog API (configurable via `CATALOG_BASE_URL`).
#[must_use]
pub fn base_url() -> String {
    std::env::var("CATALOG_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A short token that keeps names from colliding across test runs.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", id.get(..12).unwrap_or(&id))
}

/// Thin wrapper over a `reqwest` client bound to the API base URL.
pub struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    /// Create a client for [`base_url`].
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url(),
        }
    }

    /// Send a request and return the status with the body: parsed JSON,
    /// a JSON string for plain text, or `Value::Null` when empty.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> (StatusCode, Value) {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.expect("Request failed");
        let status = response.status();
        let bytes = response.bytes().await.expect("Failed to read response");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// `GET` helper.
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::GET, path, None).await
    }

    /// Look up a tag ID by name (case-insensitive). The API has no tag
    /// creation endpoint; tags come from `catalog-cli seed`.
    ///
    /// # Panics
    ///
    /// Panics if no tag with that name exists.
    pub async fn tag_id(&self, name: &str) -> String {
        let (_, tags) = self.get("/tags").await;
        tags.as_array()
            .and_then(|tags| {
                tags.iter()
                    .find(|tag| tag["name"].as_str().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            })
            .and_then(|tag| tag["id"].as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| panic!("Tag {name} not found; run the seed command first"))
    }

    /// Create a coffee and return its JSON representation.
    ///
    /// # Panics
    ///
    /// Panics unless the API answers `201 Created`.
    pub async fn create_coffee(&self, name: &str, price: &str, tag_ids: &[&str]) -> Value {
        let body = json!({
            "name": name,
            "description": "Integration test coffee, safe to delete",
            "price": price,
            "imageUrl": "https://example.com/integration.png",
            "tagIds": tag_ids,
        });
        let (status, coffee) = self
            .send(reqwest::Method::POST, "/coffees", Some(&body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{coffee}");
        coffee
    }

    /// Delete a coffee, ignoring the outcome.
    pub async fn delete_coffee(&self, id: &str) {
        let _ = self
            .send(reqwest::Method::DELETE, &format!("/coffees/{id}"), None)
            .await;
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
