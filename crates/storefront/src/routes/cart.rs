//! Cart route handlers.
//!
//! Every request rebuilds the [`CartStore`] from the session and, for
//! signed-in customers, the remote cart. The first load after sign-in is
//! where the guest cart gets merged.

use std::sync::Arc;

use axum::{Json, extract::State};
use rhema_core::BookId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::services::{CartOwner, CartSnapshot, CartStore, SessionGuestCart};
use crate::state::AppState;

/// Load the cart of the current visitor.
pub(crate) async fn load_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<CartStore> {
    let owner = CartOwner::from(user.map(|u| u.id));
    let guest = Arc::new(SessionGuestCart::new(session.clone()));
    Ok(CartStore::load(Arc::clone(state.carts()), guest, owner).await?)
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub book_id: BookId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub book_id: BookId,
    /// Signed change; the quantity never drops below 1.
    pub delta: i64,
}

/// Current cart with totals.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartSnapshot>> {
    let cart = load_cart(&state, &session, user.as_ref()).await?;
    Ok(Json(cart.snapshot()))
}

/// Add one unit of a book.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<BookRequest>,
) -> Result<Json<CartSnapshot>> {
    let book = state
        .catalog()
        .get_listed_book(request.book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("book {}", request.book_id)))?;

    let mut cart = load_cart(&state, &session, user.as_ref()).await?;
    cart.add(&book).await?;
    Ok(Json(cart.snapshot()))
}

/// Change a line quantity by `delta`.
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<CartSnapshot>> {
    let mut cart = load_cart(&state, &session, user.as_ref()).await?;
    cart.update_quantity(request.book_id, request.delta).await?;
    Ok(Json(cart.snapshot()))
}

/// Remove a line.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<BookRequest>,
) -> Result<Json<CartSnapshot>> {
    let mut cart = load_cart(&state, &session, user.as_ref()).await?;
    cart.remove(request.book_id).await?;
    Ok(Json(cart.snapshot()))
}

/// Empty the cart.
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartSnapshot>> {
    let mut cart = load_cart(&state, &session, user.as_ref()).await?;
    cart.clear().await?;
    Ok(Json(cart.snapshot()))
}
