//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use rhema_core::{Book, BookId};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// List books that are on sale, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Book>>> {
    Ok(Json(state.catalog().list_books(true).await?))
}

/// A single book on sale.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<BookId>) -> Result<Json<Book>> {
    state
        .catalog()
        .get_listed_book(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("book {id}")))
}
