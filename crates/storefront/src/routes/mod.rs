//! HTTP route handlers for storefront.
//!
//! All responses are JSON.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET  /api/books                 - Books on sale
//! GET  /api/books/{id}            - Book detail
//! GET  /api/settings              - Launch and contact settings
//!
//! # Cart
//! GET  /api/cart                  - Cart with totals (merges guest cart after sign-in)
//! POST /api/cart/add              - {book_id}
//! POST /api/cart/update           - {book_id, delta}
//! POST /api/cart/remove           - {book_id}
//! POST /api/cart/clear
//!
//! # Checkout
//! POST /api/checkout/start        - {source: "cart" | book id}
//! GET  /api/checkout              - Checkout in progress
//! POST /api/checkout/contact      - Contact and address edits
//! POST /api/checkout/postal-code  - {postal_code}
//! POST /api/checkout/shipping     - {option_id}
//! POST /api/checkout/details      - Details -> Payment
//! POST /api/checkout/back         - Payment -> Details
//! POST /api/checkout/submit       - Create order, returns payment redirect
//! GET  /checkout/return           - ?status=success|failure|pending
//!
//! # Account (requires auth)
//! GET  /api/account/orders        - Order history
//!
//! # Auth
//! POST /auth/session              - {access_token}
//! POST /auth/logout
//! ```

pub mod account;
pub mod auth;
pub mod books;
pub mod cart;
pub mod checkout;
pub mod settings;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::middleware::{api_rate_limiter, auth_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(books::index))
        .route("/{id}", get(books::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/start", post(checkout::start))
        .route("/contact", post(checkout::update_details))
        .route("/postal-code", post(checkout::postal_code))
        .route("/shipping", post(checkout::select_shipping))
        .route("/details", post(checkout::continue_to_payment))
        .route("/back", post(checkout::back))
        .route("/submit", post(checkout::submit))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(auth::create_session))
        .route("/logout", post(auth::logout))
}

fn limited(router: Router<AppState>, layer: RateLimiterLayer, enabled: bool) -> Router<AppState> {
    if enabled {
        router.layer(layer)
    } else {
        router
    }
}

fn assemble(rate_limited: bool) -> Router<AppState> {
    Router::new()
        .nest("/api/books", book_routes())
        .route("/api/settings", get(settings::show))
        .nest(
            "/api/cart",
            limited(cart_routes(), api_rate_limiter(), rate_limited),
        )
        .nest(
            "/api/checkout",
            limited(checkout_routes(), checkout_rate_limiter(), rate_limited),
        )
        .route("/checkout/return", get(checkout::payment_return))
        .route("/api/account/orders", get(account::orders))
        .nest(
            "/auth",
            limited(auth_routes(), auth_rate_limiter(), rate_limited),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    assemble(true)
}

/// All routes without per-IP rate limits, for in-process tests.
pub fn routes_without_rate_limits() -> Router<AppState> {
    assemble(false)
}
