//! HTTP route handlers for the back office.
//!
//! Every `/api` route requires a signed-in staff member (`admin` or
//! `secretary`). All responses are JSON except the CSV export.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST  /auth/session              - {access_token}, staff only
//! POST  /auth/logout
//!
//! # Dashboard
//! GET   /api/dashboard             - Revenue, counts and per-book sales
//!
//! # Orders
//! GET   /api/orders                - ?status=Todos|Pago|Aguardando|Cancelado&q=
//! GET   /api/orders/export         - Same filters, CSV download
//! PATCH /api/orders/{id}           - {status?, payment_method?}
//! DELETE /api/orders/{id}
//!
//! # Settings
//! GET   /api/settings
//! PATCH /api/settings              - Partial update
//! ```

pub mod auth;
pub mod dashboard;
pub mod orders;
pub mod settings;


use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(auth::create_session))
        .route("/logout", post(auth::logout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/export", get(orders::export))
        .route("/{id}", patch(orders::update).delete(orders::destroy))
}

fn assemble(rate_limited: bool) -> Router<AppState> {
    let auth = if rate_limited {
        auth_routes().layer(auth_rate_limiter())
    } else {
        auth_routes()
    };

    Router::new()
        .nest("/auth", auth)
        .route("/api/dashboard", get(dashboard::show))
        .nest("/api/orders", order_routes())
        .route(
            "/api/settings",
            get(settings::show).patch(settings::update),
        )
}

/// Create all routes for the back office.
pub fn routes() -> Router<AppState> {
    assemble(true)
}

/// All routes without per-IP rate limits, for in-process tests.
pub fn routes_without_rate_limits() -> Router<AppState> {
    assemble(false)
}
