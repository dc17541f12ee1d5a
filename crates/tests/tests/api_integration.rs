use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use dari_api::build_app_with_store;
use dari_observability::AppMetrics;
use dari_services::MarketplaceService;
use dari_storage::Store;
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "dev-dari-key";

async fn seeded_app() -> Router {
    let store = Store::memory();

    let service = MarketplaceService::new(Arc::new(store.clone()), AppMetrics::shared());
    service.seed_demo_data().await.expect("seed should succeed");

    build_app_with_store(store).expect("app should build")
}

fn request(method: &str, uri: &str, user_id: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY);
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = seeded_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["metrics"].is_object());
}

#[tokio::test]
async fn listings_require_api_key() {
    let app = seeded_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/listings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn browse_localizes_cards_for_the_requested_locale() {
    let app = seeded_app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/listings?locale=ar", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["pagination"]["total"], 2);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|card| card["display_title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"شقة س+2 بإطلالة على البحر في قرطاج"));

    // the rental has no English title: the French one is served instead
    let response = app
        .oneshot(request("GET", "/v1/listings?locale=en", None, None))
        .await
        .unwrap();
    let body = json_body(response).await;
    let titles: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|card| card["display_title"].as_str().unwrap().to_string())
        .collect();
    assert!(titles.contains(&"Maison de vacances à Sousse".to_string()));
}

#[tokio::test]
async fn listing_filters_are_validated() {
    let app = seeded_app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/listings?min_price=abc", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(request("GET", "/v1/listings?type=rent", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn listing_detail_resolves_locale_and_hides_pending() {
    let app = seeded_app().await;

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/v1/listings/listing-carthage?locale=en",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body["data"]["display_title"],
        "Sea-view S+2 apartment in Carthage"
    );
    assert_eq!(body["data"]["owner"]["full_name"], "Karim Trabelsi");

    let response = app
        .oneshot(request("GET", "/v1/listings/listing-sfax", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submission_moderation_and_publication_flow() {
    let app = seeded_app().await;

    let payload = json!({
        "listing_type": "rent",
        "category": "apartment",
        "title_fr": "Studio meublé au Lac 2",
        "title_ar": "ستوديو مفروش في البحيرة 2",
        "price": 850,
        "governorate": "tunis",
        "city": "Tunis",
        "images": ["https://img.dari.tn/lac2-1.jpg"]
    });

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/listings",
            Some("user-amira"),
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "pending");
    let listing_id = body["data"]["id"].as_str().unwrap().to_string();

    // a regular user cannot moderate
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/admin/listings/{listing_id}"),
            Some("user-amira"),
            Some(json!({ "status": "verified" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // the admin queue contains the submission
    let response = app
        .clone()
        .oneshot(request("GET", "/v1/admin/listings", Some("admin"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let queued: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|listing| listing["id"].as_str().unwrap())
        .collect();
    assert!(queued.contains(&listing_id.as_str()));

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/admin/listings/{listing_id}"),
            Some("admin"),
            Some(json!({ "status": "verified" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request("GET", "/v1/listings?type=rent", None, None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn invalid_submissions_get_field_level_details() {
    let app = seeded_app().await;

    let payload = json!({
        "listing_type": "sale",
        "category": "house",
        "title_fr": "Mini",
        "price": 0,
        "governorate": "tunis",
        "city": "Tunis",
        "images": []
    });

    let response = app
        .oneshot(request(
            "POST",
            "/v1/listings",
            Some("user-amira"),
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Validation error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title_fr"));
    assert!(fields.contains(&"price"));
    assert!(fields.contains(&"images"));
}

#[tokio::test]
async fn owner_checks_guard_edits_and_deletes() {
    let app = seeded_app().await;

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            "/v1/listings/listing-carthage",
            Some("user-amira"),
            Some(json!({ "price": 1 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            "/v1/listings/listing-carthage",
            Some("user-karim"),
            Some(json!({ "price": 410000 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "pending");

    let response = app
        .oneshot(request(
            "DELETE",
            "/v1/listings/listing-sousse",
            Some("user-karim"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn favorites_toggle_between_added_and_removed() {
    let app = seeded_app().await;

    let payload = json!({ "listing_id": "listing-sousse" });
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/favorites",
            Some("user-amira"),
            Some(payload.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["action"], "added");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/favorites",
            Some("user-amira"),
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["action"], "removed");

    let response = app
        .oneshot(request("GET", "/v1/favorites", Some("user-amira"), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"], json!(["listing-carthage"]));
}

#[tokio::test]
async fn messaging_flow_tracks_unread_counts() {
    let app = seeded_app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/messages",
            Some("user-amira"),
            Some(json!({
                "to_id": "user-karim",
                "listing_id": "listing-carthage",
                "content": "Est-ce que le prix est négociable ?"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/v1/messages/unread",
            Some("user-karim"),
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["count"], 1);

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/messages", Some("user-karim"), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    let conversations = body["data"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["other_user"]["id"], "user-amira");
    assert_eq!(conversations[0]["unread_count"], 1);

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            "/v1/messages/user-amira",
            Some("user-karim"),
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["marked_read"], 1);

    let response = app
        .oneshot(request(
            "GET",
            "/v1/messages/unread",
            Some("user-karim"),
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn pro_directory_registration_and_reviews() {
    let app = seeded_app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/pros?locale=ar", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"][0]["display_business_name"], "سباكة الطرابلسي");
    assert_eq!(body["data"][0]["category_label"], "سباك");

    let registration = json!({
        "business_name_fr": "Peinture Amira",
        "category": "painter",
        "phone": "22456789",
        "governorates": ["tunis"]
    });
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/pros",
            Some("user-amira"),
            Some(registration.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/pros",
            Some("user-amira"),
            Some(registration),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/reviews",
            Some("user-amira"),
            Some(json!({
                "pro_id": "pro-karim",
                "rating": 3,
                "comment": "Bon travail mais en retard."
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(request("GET", "/v1/pros/pro-karim", None, None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["reviews_count"], 2);
    assert_eq!(body["data"]["reviews"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn identity_header_is_required_and_checked() {
    let app = seeded_app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/favorites", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(request("GET", "/v1/favorites", Some("ghost"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gateway_can_sync_profiles_without_identity() {
    let app = seeded_app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/profile",
            None,
            Some(json!({
                "id": "user-new",
                "full_name": "Nouvelle Utilisatrice",
                "email": "Nouvelle@Example.TN",
                "preferred_lang": "ar"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["email"], "nouvelle@example.tn");
    assert_eq!(body["data"]["role"], "user");

    let response = app
        .oneshot(request("GET", "/v1/profile", Some("user-new"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["preferred_lang"], "ar");
}
