//! Account route handlers (signed-in customers).

use axum::{Json, extract::State};
use rhema_core::Order;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// The customer's orders with their items, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.ledger().orders_for_user(user.id).await?))
}
