//! Currency and category API endpoints.

use axum::{extract::State, http::HeaderMap, Json};

use super::{current_user, success, ApiResult};
use crate::errors::AppError;
use crate::models::{Category, CreateCategoryRequest, CreateCurrencyRequest, Currency};
use crate::AppState;

/// GET /api/currencies - List the acting user's currencies.
pub async fn list_currencies(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<Currency>> {
    let user_email = current_user(&headers)?;
    let currencies = state.repo.list_currencies(&user_email).await?;
    success(currencies)
}

/// POST /api/currencies - Create a currency.
pub async fn create_currency(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateCurrencyRequest>,
) -> ApiResult<Currency> {
    let user_email = current_user(&headers)?;

    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Currency name is required".to_string()));
    }

    let currency = state.repo.create_currency(&user_email, &request).await?;
    success(currency)
}

/// GET /api/categories - List the acting user's categories.
pub async fn list_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<Category>> {
    let user_email = current_user(&headers)?;
    let categories = state.repo.list_categories(&user_email).await?;
    success(categories)
}

/// POST /api/categories - Create a category.
pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<Category> {
    let user_email = current_user(&headers)?;

    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Category name is required".to_string()));
    }

    let category = state.repo.create_category(&user_email, &request).await?;
    success(category)
}
