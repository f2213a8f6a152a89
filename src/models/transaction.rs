//! Transaction model, including per-transaction split overrides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Patch;

/// Split strategy override for a single transaction. Extends the group-level
/// strategies with an exact-amount split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitTypeOverride {
    Equal,
    Percentage,
    Shares,
    ExactAmount,
}

impl SplitTypeOverride {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitTypeOverride::Equal => "EQUAL",
            SplitTypeOverride::Percentage => "PERCENTAGE",
            SplitTypeOverride::Shares => "SHARES",
            SplitTypeOverride::ExactAmount => "EXACT_AMOUNT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EQUAL" => Some(SplitTypeOverride::Equal),
            "PERCENTAGE" => Some(SplitTypeOverride::Percentage),
            "SHARES" => Some(SplitTypeOverride::Shares),
            "EXACT_AMOUNT" => Some(SplitTypeOverride::ExactAmount),
            _ => None,
        }
    }
}

/// Per-member value inside a split override. `None` means the member keeps
/// the default weighting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberSplitValue {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_value: Option<i64>,
}

/// A per-transaction deviation from the group's default split.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOverride {
    pub split_type: SplitTypeOverride,
    pub members: Vec<MemberSplitValue>,
}

/// Attachment of a transaction to a transaction group. Present iff the
/// transaction is shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedTransactionData {
    pub transaction_group_id: i64,
    /// `None` means the transaction follows the group's default split.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_override: Option<SplitOverride>,
    /// Whether the last write to this attachment came from the transaction's
    /// owner. Derived from the acting user, never supplied by the caller.
    pub triggered_by_owner: bool,
}

/// Marks a transaction as financial income tied to another currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialIncomeData {
    pub related_currency_id: i64,
}

/// A transaction owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub owner_email: String,
    pub amount: i64,
    pub currency_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub date: DateTime<Utc>,
    pub note: String,
    pub receiver_currency_id: i64,
    pub receiver_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_income: Option<FinancialIncomeData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouped_data: Option<GroupedTransactionData>,
}

/// Initial split override supplied at transaction creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOverrideInit {
    pub split_type: SplitTypeOverride,
    #[serde(default)]
    pub members: Vec<MemberSplitValue>,
}

/// Initial group attachment supplied at transaction creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedTransactionInit {
    pub transaction_group_id: i64,
    #[serde(default)]
    pub split_override: Option<SplitOverrideInit>,
}

/// Request body for creating a transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub amount: i64,
    pub currency_id: i64,
    pub receiver_amount: i64,
    pub receiver_currency_id: i64,
    #[serde(default)]
    pub sender_account_id: Option<i64>,
    #[serde(default)]
    pub receiver_account_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub financial_income: Option<FinancialIncomeData>,
    #[serde(default)]
    pub grouped_data: Option<GroupedTransactionInit>,
}

/// Partial update of a transaction's financial-income data.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialIncomePatch {
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub related_currency_id: Patch<i64>,
}

/// Partial update of a transaction's split override.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOverridePatch {
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub split_type: Patch<SplitTypeOverride>,
    /// `Set` is the complete desired per-member value list; `Unset` keeps
    /// the stored values as they are.
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub members: Patch<Vec<MemberSplitValue>>,
}

/// Partial update of a transaction's group attachment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedTransactionPatch {
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub transaction_group_id: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub split_override: Patch<SplitOverridePatch>,
}

/// Request body for partially updating a transaction.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionRequest {
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub amount: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub currency_id: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub receiver_amount: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub receiver_currency_id: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub sender_account_id: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub receiver_account_id: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub category_id: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub date: Patch<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub note: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub financial_income: Patch<FinancialIncomePatch>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub grouped_data: Patch<GroupedTransactionPatch>,
}
