//! Transaction API endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use super::{current_user, success, ApiResult, CreatedId};
use crate::models::{CreateTransactionRequest, Transaction, UpdateTransactionRequest};
use crate::AppState;

/// GET /api/transactions - List the acting user's transactions.
pub async fn list_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<Transaction>> {
    let user_email = current_user(&headers)?;
    let transactions = state.repo.get_all_transactions(&user_email).await?;
    success(transactions)
}

/// POST /api/transactions - Create a transaction.
pub async fn create_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTransactionRequest>,
) -> ApiResult<CreatedId> {
    let user_email = current_user(&headers)?;
    let id = state.repo.create_transaction(&user_email, &request).await?;
    success(CreatedId { id })
}

/// PUT /api/transactions/:id - Partially update a transaction.
pub async fn update_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTransactionRequest>,
) -> ApiResult<()> {
    let user_email = current_user(&headers)?;
    state
        .repo
        .update_transaction(&user_email, id, &request)
        .await?;
    success(())
}
