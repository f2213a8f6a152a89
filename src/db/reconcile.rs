//! Pure set reconciliation for group membership and per-transaction
//! split-override values.
//!
//! The diff over the previous and desired sets is computed up front,
//! producing typed removal and upsert sequences before any row is touched.
//! Removals must be applied before upserts so an email dropped and re-added
//! in the same patch lands as a fresh row.

use std::collections::HashSet;

use crate::errors::AppError;
use crate::models::{Member, MemberPatch, MemberSplitValue};

/// Storage operations required to move a group's membership to the desired
/// set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDelta {
    /// Emails whose membership rows are deleted.
    pub removals: Vec<String>,
    /// Every desired member, new or kept, with its weight already resolved
    /// against the previous stored weight; upserts are idempotent and never
    /// touch the joined flag.
    pub upserts: Vec<MemberSplitValue>,
}

/// Compute the membership delta for a group update.
///
/// Fails with `InvariantViolation` when the desired set drops a member that
/// has already joined, or when it names the same email twice. A desired
/// member whose weight is unset keeps the stored weight; an explicit null
/// clears it.
pub fn membership_delta(
    previous: &[Member],
    desired: &[MemberPatch],
) -> Result<MembershipDelta, AppError> {
    let desired_emails = unique_emails(desired.iter().map(|m| m.email.as_str()))?;

    let mut removals = Vec::new();
    for previous_member in previous {
        if desired_emails.contains(previous_member.email.as_str()) {
            continue;
        }

        if previous_member.joined {
            return Err(AppError::InvariantViolation(format!(
                "cannot remove a member that has already accepted to join the transaction group: {}",
                previous_member.email
            )));
        }

        removals.push(previous_member.email.clone());
    }

    let upserts = desired
        .iter()
        .map(|member| {
            let stored_weight = previous
                .iter()
                .find(|p| p.email == member.email)
                .and_then(|p| p.split_value);

            MemberSplitValue {
                email: member.email.clone(),
                split_value: member.split_value.clone().resolve(stored_weight),
            }
        })
        .collect();

    Ok(MembershipDelta { removals, upserts })
}

/// Storage operations required to move a transaction's per-member override
/// values to the desired set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideDelta {
    pub removals: Vec<String>,
    pub upserts: Vec<MemberSplitValue>,
}

/// Compute the override-value delta for a transaction update.
///
/// Unlike membership, override values carry no joined semantics: any entry
/// may be added, changed, or removed freely.
pub fn override_delta(
    previous: &[MemberSplitValue],
    desired: &[MemberSplitValue],
) -> Result<OverrideDelta, AppError> {
    let desired_emails = unique_emails(desired.iter().map(|m| m.email.as_str()))?;

    let removals = previous
        .iter()
        .filter(|p| !desired_emails.contains(p.email.as_str()))
        .map(|p| p.email.clone())
        .collect();

    Ok(OverrideDelta {
        removals,
        upserts: desired.to_vec(),
    })
}

fn unique_emails<'a>(emails: impl Iterator<Item = &'a str>) -> Result<HashSet<&'a str>, AppError> {
    let mut seen = HashSet::new();
    for email in emails {
        if !seen.insert(email) {
            return Err(AppError::InvariantViolation(format!(
                "duplicate member email: {}",
                email
            )));
        }
    }
    Ok(seen)
}
