//! HTTP route handlers for the catalog API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health               - Liveness check
//! GET    /health/ready         - Readiness check (store reachable)
//!
//! # Coffees
//! GET    /coffees              - Every coffee, ordered by name
//! POST   /coffees              - Create a coffee (201)
//! GET    /coffees/search       - Filtered, paginated search
//! GET    /coffees/{id}         - Coffee detail
//! PATCH  /coffees/{id}         - Partial update, optional tag replacement
//! DELETE /coffees/{id}         - Delete (204)
//! PUT    /coffees/{id}/tags    - Replace the tag set
//!
//! # Tags
//! GET    /tags                 - Every tag, ordered by name
//! GET    /tags/{id}            - Tag detail
//! ```

pub mod coffees;
pub mod health;
pub mod tags;

use axum::{
    Router,
    body::Body,
    http::Request,
    routing::{get, put},
};
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::db::CatalogStore;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// All catalog routes, awaiting state.
pub fn routes<S: CatalogStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
        .route(
            "/coffees",
            get(coffees::list::<S>).post(coffees::create::<S>),
        )
        .route("/coffees/search", get(coffees::search::<S>))
        .route(
            "/coffees/{id}",
            get(coffees::show::<S>)
                .patch(coffees::update::<S>)
                .delete(coffees::remove::<S>),
        )
        .route("/coffees/{id}/tags", put(coffees::replace_tags::<S>))
        .route("/tags", get(tags::list::<S>))
        .route("/tags/{id}", get(tags::show::<S>))
}

/// The complete application: routes, request tracing and request IDs.
///
/// Sentry layers are added by the binary so tests can run without a client.
pub fn app<S: CatalogStore>(state: AppState<S>) -> Router {
    routes()
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use coffee_catalog_core::Tag;

    use super::*;
    use crate::config::CatalogConfig;
    use crate::db::MemoryCatalogStore;

    struct TestApp {
        state: AppState<MemoryCatalogStore>,
        sweet: Tag,
        bitter: Tag,
    }

    impl TestApp {
        async fn new() -> Self {
            let state = AppState::new(MemoryCatalogStore::new(), CatalogConfig::default());
            let tags = state
                .catalog()
                .ensure_tags(&["sweet", "bitter"])
                .await
                .unwrap();
            let [sweet, bitter] = <[Tag; 2]>::try_from(tags).unwrap();
            Self {
                state,
                sweet,
                bitter,
            }
        }

        async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let request = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(body) => request
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .unwrap();

            let response = app(self.state.clone()).oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                })
            };
            (status, value)
        }

        async fn create(&self, name: &str, price: &str, tags: &[&Tag]) -> Value {
            let ids: Vec<String> = tags.iter().map(|tag| tag.id.to_string()).collect();
            let (status, body) = self
                .send(
                    Method::POST,
                    "/coffees",
                    Some(json!({
                        "name": name,
                        "description": "A carefully roasted cup",
                        "price": price,
                        "imageUrl": "https://example.com/cup.png",
                        "tagIds": ids,
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new().await;
        assert_eq!(
            app.send(Method::GET, "/health", None).await,
            (StatusCode::OK, Value::String("ok".to_owned()))
        );
        assert_eq!(
            app.send(Method::GET, "/health/ready", None).await.0,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_create_returns_camel_case_coffee() {
        let app = TestApp::new().await;
        let body = app.create("Latte", "3.5", &[&app.sweet]).await;

        assert_eq!(body["name"], "Latte");
        assert_eq!(body["price"], "3.50");
        assert_eq!(body["imageUrl"], "https://example.com/cup.png");
        assert!(body["createdAt"].is_string());
        assert_eq!(body["tags"], json!([{ "id": app.sweet.id, "name": "sweet" }]));
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let app = TestApp::new().await;
        let valid = json!({
            "name": "Latte",
            "description": "A carefully roasted cup",
            "price": "3.50",
            "imageUrl": "https://example.com/cup.png",
            "tagIds": [app.sweet.id],
        });

        for (field, value) in [
            ("name", json!("")),
            ("description", json!("short")),
            ("price", json!("3.505")),
            ("price", json!("0")),
            ("price", json!("123456789")),
            ("imageUrl", json!("not a url")),
            ("tagIds", json!([])),
        ] {
            let mut body = valid.clone();
            body[field] = value;
            let (status, error) = app.send(Method::POST, "/coffees", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{field}: {error}");
            assert!(error["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_create_malformed_json_is_bad_request() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(Method::POST, "/coffees", Some(json!({ "name": "Latte" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Bad request"));
    }

    #[tokio::test]
    async fn test_create_with_unknown_tag_is_unprocessable() {
        let app = TestApp::new().await;
        let (status, _) = app
            .send(
                Method::POST,
                "/coffees",
                Some(json!({
                    "name": "Latte",
                    "description": "A carefully roasted cup",
                    "price": "3.50",
                    "imageUrl": "https://example.com/cup.png",
                    "tagIds": [uuid::Uuid::new_v4()],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, list) = app.send(Method::GET, "/coffees", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_search_scenario() {
        let app = TestApp::new().await;
        app.create("Latte", "3.50", &[&app.sweet]).await;
        app.create("Espresso", "2.00", &[&app.bitter]).await;

        let (status, body) = app
            .send(Method::GET, "/coffees/search?min_price=3&limit=10&offset=0", None)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "Latte");
        assert_eq!(
            body["pagination"],
            json!({ "total": 1, "page": 0, "pageSize": 10, "totalPages": 1, "hasMore": false })
        );
    }

    #[tokio::test]
    async fn test_listing_orders_names_ignoring_case() {
        let app = TestApp::new().await;
        for name in ["Latte", "americano", "espresso lungo", "Espresso"] {
            app.create(name, "3.00", &[&app.sweet]).await;
        }

        let (_, list) = app.send(Method::GET, "/coffees", None).await;
        let names: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|coffee| coffee["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["americano", "Espresso", "espresso lungo", "Latte"]);

        let (_, body) = app
            .send(Method::GET, "/coffees/search?limit=2&page=1", None)
            .await;
        assert_eq!(body["data"][0]["name"], "espresso lungo");
        assert_eq!(body["data"][1]["name"], "Latte");
    }

    #[tokio::test]
    async fn test_search_by_tag_and_page() {
        let app = TestApp::new().await;
        for name in ["Cortado", "Flat White", "Macchiato"] {
            app.create(name, "3.00", &[&app.sweet]).await;
        }
        app.create("Espresso", "2.00", &[&app.bitter]).await;

        let (_, body) = app
            .send(Method::GET, "/coffees/search?tags=SWEET&limit=1&page=1", None)
            .await;

        assert_eq!(body["data"][0]["name"], "Flat White");
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["totalPages"], 3);
        assert_eq!(body["pagination"]["hasMore"], true);
    }

    #[tokio::test]
    async fn test_search_zero_limit_is_bad_request() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(Method::GET, "/coffees/search?limit=0", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "invalid pagination: limit must be at least 1 (got 0)"
        );
    }

    #[tokio::test]
    async fn test_update_replace_and_delete() {
        let app = TestApp::new().await;
        let latte = app.create("Latte", "3.50", &[&app.sweet]).await;
        let uri = format!("/coffees/{}", latte["id"].as_str().unwrap());

        let (status, updated) = app
            .send(Method::PATCH, &uri, Some(json!({ "price": "3.95" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["price"], "3.95");
        assert_eq!(updated["tags"][0]["name"], "sweet");

        let (status, replaced) = app
            .send(
                Method::PUT,
                &format!("{uri}/tags"),
                Some(json!({ "tagIds": [app.bitter.id] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replaced["tags"], json!([{ "id": app.bitter.id, "name": "bitter" }]));

        let (status, body) = app.send(Method::DELETE, &uri, None).await;
        assert_eq!((status, body), (StatusCode::NO_CONTENT, Value::Null));

        let (status, _) = app.send(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.send(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let app = TestApp::new().await;
        let (status, body) = app.send(Method::GET, "/coffees/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_tags_endpoints() {
        let app = TestApp::new().await;

        let (status, list) = app.send(Method::GET, "/tags", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 2);
        assert_eq!(list[0]["name"], "bitter");

        let (status, tag) = app
            .send(Method::GET, &format!("/tags/{}", app.sweet.id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tag["name"], "sweet");

        let (status, _) = app
            .send(Method::GET, &format!("/tags/{}", uuid::Uuid::new_v4()), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let app = TestApp::new().await;
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();

        let response = super::app(app.state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }
}
