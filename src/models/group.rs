//! Transaction group model: a shared recurring split-expense arrangement.

use serde::{Deserialize, Serialize};

use super::Patch;

/// Default split strategy for a transaction group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitType {
    Equal,
    Percentage,
    Shares,
}

impl SplitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitType::Equal => "EQUAL",
            SplitType::Percentage => "PERCENTAGE",
            SplitType::Shares => "SHARES",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EQUAL" => Some(SplitType::Equal),
            "PERCENTAGE" => Some(SplitType::Percentage),
            "SHARES" => Some(SplitType::Shares),
            _ => None,
        }
    }
}

/// A participant in a transaction group, keyed by email within the group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub email: String,
    pub name: String,
    /// Split weight; `None` means the group default weighting applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_value: Option<i64>,
    /// Set once the invitee has accepted. Joined members cannot be removed.
    pub joined: bool,
}

/// A shared transaction group with its denormalized member list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionGroup {
    pub id: i64,
    pub name: String,
    /// Name of the currency the group was created with.
    pub original_currency: String,
    pub split_type: SplitType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub hidden: bool,
    pub members: Vec<Member>,
}

/// Request body for creating a transaction group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionGroupRequest {
    pub name: String,
    pub split_type: SplitType,
    pub currency_id: i64,
    pub category_id: i64,
}

/// Request body for accepting a group invitation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTransactionGroupRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// One member entry in a desired member set.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    pub email: String,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub split_value: Patch<i64>,
}

/// Request body for partially updating a transaction group.
///
/// A `Set` members list is the complete desired membership; omitted members
/// are removed (subject to the joined-member protection), present ones are
/// upserted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionGroupRequest {
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub split_type: Patch<SplitType>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub currency_id: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub category_id: Patch<i64>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub members: Patch<Vec<MemberPatch>>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub hidden: Patch<bool>,
}
