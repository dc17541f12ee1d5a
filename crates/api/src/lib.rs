mod rate_limit;

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use dari_core::models::{ListingStatus, Profile};
use dari_core::validate::{
    CreateListing, CreateMessage, CreateReview, ListingFilters, ProFilters, RegisterPro,
    ToggleFavorite, UpdateListing, UpdateProfile, UpsertProfile,
};
use dari_core::Locale;
use dari_observability::AppMetrics;
use dari_services::{MarketplaceService, ServiceError};
use dari_storage::Store;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::ClientRateLimiter;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
#[allow(private_interfaces)]
pub struct ApiState {
    pub service: Arc<MarketplaceService<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: ClientRateLimiter,
}

pub async fn build_app() -> Result<Router> {
    let store = if let Ok(database_url) = env::var("DARI_DATABASE_URL") {
        Store::sqlite(&database_url).await?
    } else {
        Store::memory()
    };

    build_app_with_store(store)
}

/// Router over an already-constructed store. `Store` clones share their
/// backing state, so callers can keep a handle for seeding.
pub fn build_app_with_store(store: Store) -> Result<Router> {
    let metrics = AppMetrics::shared();
    let service = Arc::new(MarketplaceService::new(Arc::new(store), metrics.clone()));

    let api_key = env::var("DARI_API_KEY").unwrap_or_else(|_| "dev-dari-key".to_string());
    let rate_limit_window = Duration::from_secs(
        env::var("DARI_API_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(60),
    );
    let rate_limit_max = env::var("DARI_API_RATE_LIMIT_MAX")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(120);

    let state = ApiState {
        service,
        metrics,
        api_key,
        limiter: ClientRateLimiter::new(rate_limit_window, rate_limit_max),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/listings", get(listings_index).post(listings_create))
        .route(
            "/v1/listings/:id",
            get(listing_show).patch(listing_update).delete(listing_delete),
        )
        .route("/v1/admin/listings", get(admin_listings_index))
        .route("/v1/admin/listings/:id", axum::routing::patch(admin_moderate))
        .route("/v1/favorites", get(favorites_index).post(favorites_toggle))
        .route("/v1/messages", get(messages_index).post(messages_create))
        .route("/v1/messages/unread", get(messages_unread))
        .route(
            "/v1/messages/:user_id",
            get(conversation_show).patch(conversation_mark_read),
        )
        .route("/v1/pros", get(pros_index).post(pros_register))
        .route("/v1/pros/:id", get(pro_show))
        .route("/v1/reviews", post(reviews_create))
        .route(
            "/v1/profile",
            get(profile_show).patch(profile_update).post(profile_sync),
        )
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

fn build_cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = env::var("DARI_ALLOWED_ORIGINS")
        .ok()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());
    if provided != Some(state.api_key.as_str()) {
        return ApiError::unauthorized().into_response();
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "local".to_string());

    if !state.limiter.allow(&client) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests" })),
        )
            .into_response();
    }

    next.run(request).await
}

struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: json!({ "error": "Unauthorized" }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound(what) => Self {
                status: StatusCode::NOT_FOUND,
                body: json!({ "error": format!("{what} not found") }),
            },
            ServiceError::Forbidden => Self {
                status: StatusCode::FORBIDDEN,
                body: json!({ "error": "Forbidden" }),
            },
            ServiceError::Conflict(message) => Self {
                status: StatusCode::CONFLICT,
                body: json!({ "error": message }),
            },
            ServiceError::Invalid(validation) => Self {
                status: StatusCode::BAD_REQUEST,
                body: json!({ "error": "Validation error", "details": validation.issues }),
            },
            ServiceError::Storage(error) => {
                tracing::error!(error = %error, "storage failure");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: json!({ "error": "Internal server error" }),
                }
            }
        }
    }
}

impl From<dari_core::ValidationError> for ApiError {
    fn from(error: dari_core::ValidationError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": "Validation error", "details": error.issues }),
        }
    }
}

fn locale_from(params: &HashMap<String, String>) -> Locale {
    Locale::from_optional_str(params.get("locale").map(String::as_str))
}

async fn require_profile(state: &ApiState, headers: &HeaderMap) -> Result<Profile, ApiError> {
    let Some(user_id) = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
    else {
        return Err(ApiError::unauthorized());
    };

    state
        .service
        .get_profile(user_id)
        .await
        .map_err(ApiError::from)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = json!({
        "status": "ok",
        "timestamp_utc": chrono::Utc::now().to_rfc3339(),
        "metrics": state.metrics.snapshot(),
    });
    (StatusCode::OK, Json(payload))
}

async fn listings_index(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let filters = ListingFilters::from_params(&params)?;
    let locale = locale_from(&params);
    let page = state.service.browse_listings(filters, locale).await?;
    Ok((StatusCode::OK, Json(page)).into_response())
}

async fn listings_create(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(input): Json<CreateListing>,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let listing = state.service.create_listing(&profile, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": listing }))).into_response())
}

async fn listing_show(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let locale = locale_from(&params);
    let detail = state.service.listing_detail(&id, locale).await?;
    Ok((StatusCode::OK, Json(json!({ "data": detail }))).into_response())
}

async fn listing_update(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<UpdateListing>,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let listing = state.service.update_listing(&profile.id, &id, patch).await?;
    Ok((StatusCode::OK, Json(json!({ "data": listing }))).into_response())
}

async fn listing_delete(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    state.service.delete_listing(&profile.id, &id).await?;
    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}

async fn admin_listings_index(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let queue = state.service.moderation_queue(&profile).await?;
    Ok((StatusCode::OK, Json(json!({ "data": queue }))).into_response())
}

#[derive(Debug, Deserialize)]
struct ModerateListingRequest {
    status: ListingStatus,
}

async fn admin_moderate(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<ModerateListingRequest>,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let listing = state
        .service
        .moderate_listing(&profile, &id, input.status)
        .await?;
    Ok((StatusCode::OK, Json(json!({ "data": listing }))).into_response())
}

async fn favorites_index(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let ids = state.service.favorites(&profile.id).await?;
    Ok((StatusCode::OK, Json(json!({ "data": ids }))).into_response())
}

async fn favorites_toggle(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(input): Json<ToggleFavorite>,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let outcome = state.service.toggle_favorite(&profile.id, input).await?;

    let status = match outcome.action {
        dari_services::FavoriteAction::Added => StatusCode::CREATED,
        dari_services::FavoriteAction::Removed => StatusCode::OK,
    };
    Ok((status, Json(json!({ "data": outcome }))).into_response())
}

async fn messages_index(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let conversations = state.service.conversations(&profile.id).await?;
    Ok((StatusCode::OK, Json(json!({ "data": conversations }))).into_response())
}

async fn messages_create(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(input): Json<CreateMessage>,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let message = state.service.send_message(&profile, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": message }))).into_response())
}

async fn messages_unread(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let count = state.service.unread_count(&profile.id).await?;
    Ok((StatusCode::OK, Json(json!({ "data": { "count": count } }))).into_response())
}

async fn conversation_show(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let messages = state.service.conversation_with(&profile.id, &user_id).await?;
    Ok((StatusCode::OK, Json(json!({ "data": messages }))).into_response())
}

async fn conversation_mark_read(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let marked = state
        .service
        .mark_conversation_read(&profile.id, &user_id)
        .await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "data": { "marked_read": marked } })),
    )
        .into_response())
}

async fn pros_index(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let filters = ProFilters::from_params(&params)?;
    let locale = locale_from(&params);
    let page = state.service.list_pros(filters, locale).await?;
    Ok((StatusCode::OK, Json(page)).into_response())
}

async fn pros_register(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(input): Json<RegisterPro>,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let pro = state.service.register_pro(&profile, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": pro }))).into_response())
}

async fn pro_show(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let locale = locale_from(&params);
    let detail = state.service.pro_detail(&id, locale).await?;
    Ok((StatusCode::OK, Json(json!({ "data": detail }))).into_response())
}

async fn reviews_create(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(input): Json<CreateReview>,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let review = state.service.submit_review(&profile, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": review }))).into_response())
}

async fn profile_show(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    Ok((StatusCode::OK, Json(json!({ "data": profile }))).into_response())
}

async fn profile_update(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(input): Json<UpdateProfile>,
) -> Result<Response, ApiError> {
    let profile = require_profile(&state, &headers).await?;
    let updated = state.service.update_profile(&profile.id, input).await?;
    Ok((StatusCode::OK, Json(json!({ "data": updated }))).into_response())
}

/// Identity sync from the upstream auth gateway. Guarded by the API key
/// like every other route; no end-user identity required.
async fn profile_sync(
    State(state): State<ApiState>,
    Json(input): Json<UpsertProfile>,
) -> Result<Response, ApiError> {
    let profile = state.service.sync_profile(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": profile }))).into_response())
}
