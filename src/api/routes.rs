use crate::account::validation::{valid_subdomain, valid_txt};
use crate::account::{CidrList, TxtRecord};
use crate::api::api_error::APIError;
use crate::api::auth;
use crate::api::model::{AuthorizedRecord, RegisterRequest, RegisterResult, TxtResult};
use crate::api::server::AppState;
use crate::error::Error;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/update", post(update))
        .route("/delete", post(delete))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .merge(authenticated);
    if !state.config.disable_registration {
        router = router.route("/register", post(register));
    }

    router
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        // Browsers must be allowed to send the credential headers cross origin.
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-api-user"),
            HeaderName::from_static("x-api-key"),
        ])
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<RegisterResult>), APIError> {
    let request: RegisterRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RegisterRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(Error::MalformedJson)?
    };
    let allow_from = CidrList::new(request.allowfrom);
    allow_from.validate()?;

    let registration = state.store.register(&allow_from).await?;
    let fulldomain = state.config.full_domain(&registration.subdomain);
    tracing::info!(
        username = %registration.username,
        subdomain = %registration.subdomain,
        "registered account"
    );
    Ok((
        StatusCode::CREATED,
        Json(RegisterResult::new(registration, fulldomain)),
    ))
}

fn validated(record: TxtRecord) -> Result<TxtRecord, Error> {
    if !valid_subdomain(&record.subdomain) {
        return Err(Error::BadSubdomain);
    }
    if !valid_txt(&record.value) {
        return Err(Error::BadTxt);
    }
    Ok(record)
}

async fn update(
    State(state): State<AppState>,
    Extension(authorized): Extension<AuthorizedRecord>,
) -> Result<Json<TxtResult>, APIError> {
    let record = validated(authorized.record)?;
    state.store.add_txt(&record).await?;
    tracing::info!(subdomain = %record.subdomain, "published TXT value");
    Ok(Json(TxtResult { txt: record.value }))
}

async fn delete(
    State(state): State<AppState>,
    Extension(authorized): Extension<AuthorizedRecord>,
) -> Result<Json<TxtResult>, APIError> {
    let record = validated(authorized.record)?;
    state.store.delete_txt(&record).await?;
    tracing::info!(
        subdomain = %record.subdomain,
        username = %authorized.account.username,
        "withdrew TXT value"
    );
    Ok(Json(TxtResult { txt: record.value }))
}
