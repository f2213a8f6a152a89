//! User-owned currency and category models.

use serde::{Deserialize, Serialize};

/// A currency defined by a user. Groups and transactions may only reference
/// currencies owned by the acting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub id: i64,
    pub owner_email: String,
    pub name: String,
}

/// A spending category defined by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub owner_email: String,
    pub name: String,
}

/// Request body for creating a currency.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCurrencyRequest {
    pub name: String,
}

/// Request body for creating a category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
}
