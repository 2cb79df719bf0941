//! Application setup and router configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domains::auth::JwtService;
use crate::kernel::Market;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    complete_purchase_handler, delist_listing_handler, get_listing_handler, get_purchase_handler,
    health_handler, initiate_purchase_handler, list_listings_handler, open_items_handler, open_wallet_handler,
    payment_callback_handler, resolve_item_handler, review_listing_handler, submit_listing_handler,
    wallet_handler, WEBHOOK_SECRET_HEADER,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub market: Market,
    /// Shared secret the payment provider sends on every callback
    pub webhook_secret: Arc<str>,
}

/// Build the Axum application router
pub fn build_app(market: Market, jwt_service: Arc<JwtService>, webhook_secret: String) -> Router {
    let app_state = AppState {
        market,
        webhook_secret: webhook_secret.into(),
    };

    // CORS configuration - allow any origin; auth is by bearer token, not cookie
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(WEBHOOK_SECRET_HEADER),
        ]);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/listings",
            get(list_listings_handler).post(submit_listing_handler),
        )
        .route("/listings/:id", get(get_listing_handler))
        .route("/listings/:id/review", post(review_listing_handler))
        .route("/listings/:id/delist", post(delist_listing_handler))
        .route("/purchases", post(initiate_purchase_handler))
        .route("/purchases/:id", get(get_purchase_handler))
        .route("/purchases/:id/complete", post(complete_purchase_handler))
        .route("/payments/callback", post(payment_callback_handler))
        .route("/wallet", get(wallet_handler).post(open_wallet_handler))
        .route("/admin/reconciliation", get(open_items_handler))
        .route(
            "/admin/reconciliation/:id/resolve",
            post(resolve_item_handler),
        )
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
