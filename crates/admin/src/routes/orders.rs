//! Order ledger route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use rhema_core::{OrderId, OrderUpdate};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::services::{OrderListing, StatusFilter, export_csv};
use crate::state::AppState;

/// Query parameters shared by the list and the export.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    /// `Todos` (or absent) for every status.
    #[serde(default)]
    pub status: String,
    /// Matches customer name, email or order id.
    #[serde(default)]
    pub q: String,
}

impl OrderQuery {
    fn filter(&self) -> Result<StatusFilter> {
        self.status.parse().map_err(AppError::BadRequest)
    }
}

/// Filtered orders with stats over the whole ledger.
#[instrument(skip(state, _staff))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<OrderQuery>,
) -> Result<Json<OrderListing>> {
    let listing = state.orders().list(query.filter()?, &query.q).await?;
    Ok(Json(listing))
}

/// Download the filtered orders as CSV.
#[instrument(skip(state, staff))]
pub async fn export(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(query): Query<OrderQuery>,
) -> Result<impl IntoResponse> {
    let listing = state.orders().list(query.filter()?, &query.q).await?;
    info!(
        user_id = %staff.id,
        rows = listing.orders.len(),
        "Orders exported"
    );

    let filename = format!(
        "attachment; filename=\"vendas_rhema_{}.csv\"",
        Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        export_csv(&listing.orders),
    ))
}

/// Change an order's status or payment method label.
#[instrument(skip(state, staff))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
    Json(update): Json<OrderUpdate>,
) -> Result<StatusCode> {
    state.orders().update(id, update).await?;
    info!(order_id = %id, user_id = %staff.id, "Order edited from back office");
    Ok(StatusCode::NO_CONTENT)
}

/// Delete an order and its items.
#[instrument(skip(state, staff))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    state.orders().delete(id).await?;
    info!(order_id = %id, user_id = %staff.id, "Order deleted from back office");
    Ok(StatusCode::NO_CONTENT)
}
