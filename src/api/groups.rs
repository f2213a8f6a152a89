//! Transaction group API endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use super::{current_user, success, ApiResult, CreatedId};
use crate::errors::AppError;
use crate::models::{
    CreateTransactionGroupRequest, JoinTransactionGroupRequest, TransactionGroup,
    UpdateTransactionGroupRequest,
};
use crate::AppState;

/// GET /api/transaction-groups - List the acting user's transaction groups.
pub async fn list_transaction_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<TransactionGroup>> {
    let user_email = current_user(&headers)?;
    let groups = state.repo.get_user_transaction_groups(&user_email).await?;
    success(groups)
}

/// POST /api/transaction-groups - Create a transaction group.
pub async fn create_transaction_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTransactionGroupRequest>,
) -> ApiResult<CreatedId> {
    let user_email = current_user(&headers)?;

    // Validate required fields
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Group name is required".to_string()));
    }

    let id = state
        .repo
        .create_transaction_group(&user_email, &request)
        .await?;
    success(CreatedId { id })
}

/// PUT /api/transaction-groups/:id - Partially update a transaction group.
pub async fn update_transaction_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTransactionGroupRequest>,
) -> ApiResult<()> {
    let user_email = current_user(&headers)?;
    state
        .repo
        .update_transaction_group(&user_email, id, &request)
        .await?;
    success(())
}

/// POST /api/transaction-groups/:id/join - Accept an invitation.
pub async fn join_transaction_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<JoinTransactionGroupRequest>,
) -> ApiResult<()> {
    let user_email = current_user(&headers)?;
    let display_name = request.name.as_deref();
    state
        .repo
        .mark_member_joined(id, &user_email, display_name)
        .await?;
    success(())
}
