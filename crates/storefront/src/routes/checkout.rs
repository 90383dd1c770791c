//! Checkout route handlers.
//!
//! The in-progress [`CheckoutState`] lives in the session. Each handler loads
//! it, applies one transition through [`Checkout`](crate::services::Checkout)
//! and stores it back, also when the transition failed, so notices survive.

use axum::{
    Json,
    extract::{Query, State},
};
use rhema_core::{BookId, CartItem, ShippingOptionId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};

use super::cart::load_cart;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, session_keys};
use crate::services::checkout::{CheckoutView, DetailsUpdate, PaymentReturnStatus};
use crate::services::{CheckoutError, CheckoutSource, CheckoutState};
use crate::state::AppState;

async fn load_state(session: &Session) -> Result<CheckoutState> {
    session
        .get::<CheckoutState>(session_keys::CHECKOUT)
        .await?
        .ok_or_else(|| AppError::NotFound("no checkout in progress".to_string()))
}

async fn save_state(session: &Session, state: &CheckoutState) -> Result<()> {
    session.insert(session_keys::CHECKOUT, state).await?;
    Ok(())
}

/// Items being bought: the cart, or one unit of the chosen book.
async fn checkout_items(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    source: CheckoutSource,
) -> Result<Vec<CartItem>> {
    match source {
        CheckoutSource::Cart => {
            let cart = load_cart(state, session, user).await?;
            Ok(cart.items().to_vec())
        }
        CheckoutSource::Book(id) => {
            let book = state
                .catalog()
                .get_listed_book(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("book {id}")))?;
            Ok(vec![CartItem::from_book(&book, 1)])
        }
    }
}

/// Store the state and render it with the current items.
async fn respond(
    app: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    state: &CheckoutState,
    outcome: std::result::Result<(), CheckoutError>,
) -> Result<Json<CheckoutView>> {
    save_state(session, state).await?;
    outcome?;
    let items = checkout_items(app, session, user, state.source).await?;
    Ok(Json(app.checkout().view(state, &items)))
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// `"cart"` or a book id for "buy now".
    pub source: String,
}

fn parse_source(source: &str) -> Result<CheckoutSource> {
    if source.trim().eq_ignore_ascii_case("cart") {
        return Ok(CheckoutSource::Cart);
    }
    source
        .trim()
        .parse::<BookId>()
        .map(CheckoutSource::Book)
        .map_err(|_| AppError::BadRequest("source must be \"cart\" or a book id".to_string()))
}

/// Start a new checkout, replacing any previous one.
#[instrument(skip(app, session, user))]
pub async fn start(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<StartRequest>,
) -> Result<Json<CheckoutView>> {
    let source = parse_source(&request.source)?;
    let items = checkout_items(&app, &session, user.as_ref(), source).await?;
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }

    let state = CheckoutState::new(source);
    save_state(&session, &state).await?;
    info!(checkout_id = %state.id, "Checkout started");
    Ok(Json(app.checkout().view(&state, &items)))
}

/// The checkout in progress.
#[instrument(skip_all)]
pub async fn show(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CheckoutView>> {
    let state = load_state(&session).await?;
    let items = checkout_items(&app, &session, user.as_ref(), state.source).await?;
    Ok(Json(app.checkout().view(&state, &items)))
}

/// Edit contact and address fields.
#[instrument(skip_all)]
pub async fn update_details(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(update): Json<DetailsUpdate>,
) -> Result<Json<CheckoutView>> {
    let mut state = load_state(&session).await?;
    let items = checkout_items(&app, &session, user.as_ref(), state.source).await?;
    let outcome = app
        .checkout()
        .update_details(&mut state, update, &items)
        .await;
    respond(&app, &session, user.as_ref(), &state, outcome).await
}

#[derive(Debug, Deserialize)]
pub struct PostalCodeRequest {
    pub postal_code: String,
}

/// Enter the postal code; a complete one triggers lookup and quote.
#[instrument(skip_all)]
pub async fn postal_code(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<PostalCodeRequest>,
) -> Result<Json<CheckoutView>> {
    let mut state = load_state(&session).await?;
    let items = checkout_items(&app, &session, user.as_ref(), state.source).await?;
    let outcome = app
        .checkout()
        .enter_postal_code(&mut state, &request.postal_code, &items)
        .await
        .map(|_| ());
    respond(&app, &session, user.as_ref(), &state, outcome).await
}

#[derive(Debug, Deserialize)]
pub struct ShippingRequest {
    pub option_id: ShippingOptionId,
}

/// Select a delivery method.
#[instrument(skip(app, session, user))]
pub async fn select_shipping(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<ShippingRequest>,
) -> Result<Json<CheckoutView>> {
    let mut state = load_state(&session).await?;
    let outcome = state.select_shipping(request.option_id);
    respond(&app, &session, user.as_ref(), &state, outcome).await
}

/// Details → Payment.
#[instrument(skip_all)]
pub async fn continue_to_payment(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CheckoutView>> {
    let mut state = load_state(&session).await?;
    let items = checkout_items(&app, &session, user.as_ref(), state.source).await?;
    let outcome = state.continue_to_payment(&items);
    respond(&app, &session, user.as_ref(), &state, outcome).await
}

/// Payment → Details.
#[instrument(skip_all)]
pub async fn back(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CheckoutView>> {
    let mut state = load_state(&session).await?;
    let outcome = state.back_to_details();
    respond(&app, &session, user.as_ref(), &state, outcome).await
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Hosted payment page to send the customer to.
    pub redirect_url: String,
    pub order_id: Option<rhema_core::OrderId>,
}

/// Create the order and the payment redirect.
#[instrument(skip_all)]
pub async fn submit(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<SubmitResponse>> {
    let mut state = load_state(&session).await?;
    let items = checkout_items(&app, &session, user.as_ref(), state.source).await?;
    let outcome = app
        .checkout()
        .submit(&mut state, &items, user.as_ref().map(|u| u.id))
        .await;
    save_state(&session, &state).await?;

    let redirect = outcome?;
    Ok(Json(SubmitResponse {
        redirect_url: redirect.init_point,
        order_id: state.last_order_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    pub status: PaymentReturnStatus,
}

/// Landing point of the payment gateway's back URLs.
///
/// Only `success` finishes the checkout; a cart checkout then empties the
/// cart. The order status is left to the payment notification handler.
#[instrument(skip(app, session, user))]
pub async fn payment_return(
    State(app): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ReturnQuery>,
) -> Result<Json<CheckoutView>> {
    let mut state = load_state(&session).await?;
    if state.complete_return(query.status) && state.source == CheckoutSource::Cart {
        let mut cart = load_cart(&app, &session, user.as_ref()).await?;
        cart.clear().await?;
        info!(checkout_id = %state.id, order_id = ?state.last_order_id, "Checkout completed");
    }
    respond(&app, &session, user.as_ref(), &state, Ok(())).await
}
