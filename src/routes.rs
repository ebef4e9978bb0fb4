//! Router construction and shared handler state.

use crate::{config::Config, handlers, middleware, store::KeyStore};
use axum::{
    Router,
    http::{HeaderName, Method, header::CONTENT_TYPE},
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// State shared with every handler via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<KeyStore>,
    pub config: Arc<Config>,
}

/// Build the full HTTP router.
pub fn build_router(state: AppState) -> Router {
    // Admin routes, each one guarded by the admin key middleware
    let admin_routes = Router::new()
        .route(
            "/admin/keys",
            get(handlers::admin::list_keys).post(handlers::admin::generate_key),
        )
        .route("/admin/keys/{key}", delete(handlers::admin::delete_key))
        .route(
            "/admin/keys/{key}/toggle",
            post(handlers::admin::toggle_active),
        )
        .route(
            "/admin/keys/{key}/blacklist",
            post(handlers::admin::toggle_blacklist),
        )
        .route(
            "/admin/keys/{key}/reset-hwid",
            post(handlers::admin::reset_binding),
        )
        .route("/admin/reload", post(handlers::admin::reload))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    // Scripts run inside a sandboxed client that sends cross-origin requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(middleware::auth::ADMIN_KEY_HEADER),
        ]);

    let mut app = Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route(
            "/validate",
            get(handlers::validate::validate_get).post(handlers::validate::validate_post),
        )
        .merge(admin_routes);

    if let Some(public_dir) = &state.config.public_dir {
        app = app.fallback_service(ServeDir::new(public_dir));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
