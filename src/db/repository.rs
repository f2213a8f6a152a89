//! Database repository for the patch & reconciliation engine.
//!
//! The repository is the only component that opens, commits, or rolls back a
//! database transaction. Every public update operation runs as one atomic
//! unit: previous-state reads, diff computation, and all writes happen on the
//! same transaction handle, then commit. Any step failing rolls the whole
//! unit back; rollback failures are logged and never mask the original error.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::db::reconcile;
use crate::errors::AppError;
use crate::models::{
    Category, CreateCategoryRequest, CreateCurrencyRequest, CreateTransactionGroupRequest,
    CreateTransactionRequest, Currency, FinancialIncomeData, GroupedTransactionData, Member,
    MemberSplitValue, Patch, SplitOverride, SplitType, SplitTypeOverride, Transaction,
    TransactionGroup, UpdateTransactionGroupRequest, UpdateTransactionRequest,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== CURRENCY & CATEGORY OPERATIONS ====================

    /// Create a currency owned by the given user.
    pub async fn create_currency(
        &self,
        owner_email: &str,
        request: &CreateCurrencyRequest,
    ) -> Result<Currency, AppError> {
        let result = sqlx::query("INSERT INTO currencies (owner_email, name) VALUES (?, ?)")
            .bind(owner_email)
            .bind(&request.name)
            .execute(&self.pool)
            .await?;

        Ok(Currency {
            id: result.last_insert_rowid(),
            owner_email: owner_email.to_string(),
            name: request.name.clone(),
        })
    }

    /// List the currencies owned by the given user.
    pub async fn list_currencies(&self, owner_email: &str) -> Result<Vec<Currency>, AppError> {
        let rows =
            sqlx::query("SELECT id, owner_email, name FROM currencies WHERE owner_email = ? ORDER BY name")
                .bind(owner_email)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.iter().map(currency_from_row).collect())
    }

    /// Create a category owned by the given user.
    pub async fn create_category(
        &self,
        owner_email: &str,
        request: &CreateCategoryRequest,
    ) -> Result<Category, AppError> {
        let result = sqlx::query("INSERT INTO categories (owner_email, name) VALUES (?, ?)")
            .bind(owner_email)
            .bind(&request.name)
            .execute(&self.pool)
            .await?;

        Ok(Category {
            id: result.last_insert_rowid(),
            owner_email: owner_email.to_string(),
            name: request.name.clone(),
        })
    }

    /// List the categories owned by the given user.
    pub async fn list_categories(&self, owner_email: &str) -> Result<Vec<Category>, AppError> {
        let rows =
            sqlx::query("SELECT id, owner_email, name FROM categories WHERE owner_email = ? ORDER BY name")
                .bind(owner_email)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    // ==================== TRANSACTION GROUP OPERATIONS ====================

    /// Create a transaction group with its creator as first, already-joined
    /// member. The referenced currency and category must belong to the
    /// creator; the check runs inside the same transaction as the insert.
    pub async fn create_transaction_group(
        &self,
        creator_email: &str,
        request: &CreateTransactionGroupRequest,
    ) -> Result<i64, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("beginning db transaction: {}", e)))?;

        match create_transaction_group_in_tx(&mut tx, creator_email, request).await {
            Ok(group_id) => {
                tx.commit()
                    .await
                    .map_err(|e| AppError::Database(format!("committing transaction: {}", e)))?;
                Ok(group_id)
            }
            Err(err) => {
                if let Err(rb_err) = tx.rollback().await {
                    tracing::error!("transaction group creation rollback error: {}", rb_err);
                }
                Err(err)
            }
        }
    }

    /// Partially update a transaction group.
    ///
    /// The acting user must already be a member. When the patch carries a
    /// members field, the stored membership is reconciled against it:
    /// removals first (joined members are protected), then idempotent
    /// upserts. Scalar fields are applied from their `Set` values.
    pub async fn update_transaction_group(
        &self,
        acting_email: &str,
        group_id: i64,
        patch: &UpdateTransactionGroupRequest,
    ) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("beginning db transaction: {}", e)))?;

        match update_transaction_group_in_tx(&mut tx, acting_email, group_id, patch).await {
            Ok(()) => tx
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("committing transaction: {}", e))),
            Err(err) => {
                if let Err(rb_err) = tx.rollback().await {
                    tracing::error!("transaction group update rollback error: {}", rb_err);
                }
                Err(err)
            }
        }
    }

    /// List all transaction groups the user is a member of, with their
    /// denormalized member lists.
    pub async fn get_user_transaction_groups(
        &self,
        user_email: &str,
    ) -> Result<Vec<TransactionGroup>, AppError> {
        let rows = sqlx::query(
            r#"SELECT g.id, g.name, g.split_type, g.original_currency, g.currency_id,
                      g.category_id, g.hidden
               FROM transaction_groups g
               JOIN transaction_group_members m ON m.transaction_group_id = g.id
               WHERE m.user_email = ?
               ORDER BY g.id"#,
        )
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let group_id: i64 = row.get("id");
            let members = self.get_group_members(group_id).await?;

            let split_type: String = row.get("split_type");
            let split_type = SplitType::from_str(&split_type).ok_or_else(|| {
                AppError::Database(format!(
                    "unknown split type {} while assembling transaction groups",
                    split_type
                ))
            })?;

            groups.push(TransactionGroup {
                id: group_id,
                name: row.get("name"),
                original_currency: row.get("original_currency"),
                split_type,
                currency_id: row.get("currency_id"),
                category_id: row.get("category_id"),
                hidden: row.get("hidden"),
                members,
            });
        }

        Ok(groups)
    }

    /// Mark a member as joined (invite acceptance), optionally recording a
    /// display name. Joined members cannot be removed afterwards.
    pub async fn mark_member_joined(
        &self,
        group_id: i64,
        user_email: &str,
        display_name: Option<&str>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"UPDATE transaction_group_members
               SET joined = 1, user_name = COALESCE(?, user_name)
               WHERE transaction_group_id = ? AND user_email = ?"#,
        )
        .bind(display_name)
        .bind(group_id)
        .bind(user_email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Member {} not found in transaction group {}",
                user_email, group_id
            )));
        }

        Ok(())
    }

    /// Read the current member list of a group.
    async fn get_group_members(&self, group_id: i64) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(
            r#"SELECT user_email, user_name, split_value, joined
               FROM transaction_group_members
               WHERE transaction_group_id = ?
               ORDER BY user_email"#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    // ==================== TRANSACTION OPERATIONS ====================

    /// Create a transaction, together with its optional financial-income
    /// data, group attachment, and initial override values, in one unit.
    pub async fn create_transaction(
        &self,
        owner_email: &str,
        request: &CreateTransactionRequest,
    ) -> Result<i64, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("beginning db transaction: {}", e)))?;

        match create_transaction_in_tx(&mut tx, owner_email, request).await {
            Ok(transaction_id) => {
                tx.commit()
                    .await
                    .map_err(|e| AppError::Database(format!("committing transaction: {}", e)))?;
                Ok(transaction_id)
            }
            Err(err) => {
                if let Err(rb_err) = tx.rollback().await {
                    tracing::error!("transaction creation rollback error: {}", rb_err);
                }
                Err(err)
            }
        }
    }

    /// Partially update a transaction.
    ///
    /// Scalar fields only apply when the acting user owns the transaction.
    /// The grouped-transaction field follows §tri-state semantics: untouched
    /// when unset, fully detached when cleared, reconciled when set. The
    /// `triggered_by_owner` flag is derived from the acting user, never taken
    /// from the caller.
    pub async fn update_transaction(
        &self,
        acting_email: &str,
        transaction_id: i64,
        patch: &UpdateTransactionRequest,
    ) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("beginning db transaction: {}", e)))?;

        match update_transaction_in_tx(&mut tx, acting_email, transaction_id, patch).await {
            Ok(()) => tx
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("committing transaction: {}", e))),
            Err(err) => {
                if let Err(rb_err) = tx.rollback().await {
                    tracing::error!("transaction update rollback error: {}", rb_err);
                }
                Err(err)
            }
        }
    }

    /// List all transactions owned by the user, with grouped data and
    /// per-member override values assembled.
    pub async fn get_all_transactions(
        &self,
        owner_email: &str,
    ) -> Result<Vec<Transaction>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.id, t.owner_email, t.amount, t.currency_id, t.sender_account_id,
                      t.receiver_account_id, t.category_id, t.date, t.note,
                      t.receiver_currency_id, t.receiver_amount,
                      f.related_currency_id,
                      g.transaction_group_id, g.split_type_override, g.triggered_by_owner
               FROM transactions t
               LEFT JOIN financial_income f ON f.transaction_id = t.id
               LEFT JOIN grouped_transactions g ON g.transaction_id = t.id
               WHERE t.owner_email = ?
               ORDER BY t.date, t.id"#,
        )
        .bind(owner_email)
        .fetch_all(&self.pool)
        .await?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in &rows {
            let transaction_id: i64 = row.get("id");

            let financial_income = row
                .get::<Option<i64>, _>("related_currency_id")
                .map(|related_currency_id| FinancialIncomeData {
                    related_currency_id,
                });

            let grouped_data = match row.get::<Option<i64>, _>("transaction_group_id") {
                Some(transaction_group_id) => {
                    let split_override = match row.get::<Option<String>, _>("split_type_override") {
                        Some(split_type) => {
                            let split_type =
                                SplitTypeOverride::from_str(&split_type).ok_or_else(|| {
                                    AppError::Database(format!(
                                        "unknown split type override {} while assembling transactions",
                                        split_type
                                    ))
                                })?;
                            let members = self.get_override_values(transaction_id).await?;
                            Some(SplitOverride {
                                split_type,
                                members,
                            })
                        }
                        None => None,
                    };

                    Some(GroupedTransactionData {
                        transaction_group_id,
                        split_override,
                        triggered_by_owner: row.get("triggered_by_owner"),
                    })
                }
                None => None,
            };

            transactions.push(Transaction {
                id: transaction_id,
                owner_email: row.get("owner_email"),
                amount: row.get("amount"),
                currency_id: row.get("currency_id"),
                sender_account_id: row.get("sender_account_id"),
                receiver_account_id: row.get("receiver_account_id"),
                category_id: row.get("category_id"),
                date: row.get("date"),
                note: row.get("note"),
                receiver_currency_id: row.get("receiver_currency_id"),
                receiver_amount: row.get("receiver_amount"),
                financial_income,
                grouped_data,
            });
        }

        Ok(transactions)
    }

    /// Read the per-member override values of a transaction.
    async fn get_override_values(
        &self,
        transaction_id: i64,
    ) -> Result<Vec<MemberSplitValue>, AppError> {
        let rows = sqlx::query(
            r#"SELECT user_email, split_value
               FROM grouped_transaction_member_values
               WHERE transaction_id = ?
               ORDER BY user_email"#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(override_value_from_row).collect())
    }
}

// ==================== TRANSACTION-SCOPED HELPERS ====================

/// Confirm a currency belongs to the acting user and return it.
async fn check_currency_ownership(
    conn: &mut SqliteConnection,
    email: &str,
    currency_id: i64,
) -> Result<Currency, AppError> {
    let row = sqlx::query("SELECT id, owner_email, name FROM currencies WHERE id = ?")
        .bind(currency_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::Database(format!("retrieving currency details: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Currency {} not found", currency_id)))?;

    let currency = currency_from_row(&row);
    if currency.owner_email != email {
        return Err(AppError::Ownership(format!(
            "currency {} does not belong to {}",
            currency_id, email
        )));
    }

    Ok(currency)
}

/// Confirm a category belongs to the acting user.
async fn check_category_ownership(
    conn: &mut SqliteConnection,
    email: &str,
    category_id: i64,
) -> Result<(), AppError> {
    let row = sqlx::query("SELECT owner_email FROM categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::Database(format!("retrieving category details: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", category_id)))?;

    let owner_email: String = row.get("owner_email");
    if owner_email != email {
        return Err(AppError::Ownership(format!(
            "category {} does not belong to {}",
            category_id, email
        )));
    }

    Ok(())
}

/// Check that a transaction group exists.
async fn check_group_exists(conn: &mut SqliteConnection, group_id: i64) -> Result<(), AppError> {
    sqlx::query("SELECT id FROM transaction_groups WHERE id = ?")
        .bind(group_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::Database(format!("retrieving transaction group: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Transaction group {} not found", group_id)))?;

    Ok(())
}

async fn create_transaction_group_in_tx(
    conn: &mut SqliteConnection,
    creator_email: &str,
    request: &CreateTransactionGroupRequest,
) -> Result<i64, AppError> {
    let currency = check_currency_ownership(conn, creator_email, request.currency_id).await?;
    check_category_ownership(conn, creator_email, request.category_id).await?;

    let result = sqlx::query(
        r#"INSERT INTO transaction_groups
               (name, split_type, original_currency, currency_id, category_id, hidden)
           VALUES (?, ?, ?, ?, ?, 0)"#,
    )
    .bind(&request.name)
    .bind(request.split_type.as_str())
    .bind(&currency.name)
    .bind(request.currency_id)
    .bind(request.category_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("inserting transaction group: {}", e)))?;

    let group_id = result.last_insert_rowid();

    sqlx::query(
        r#"INSERT INTO transaction_group_members
               (transaction_group_id, user_email, user_name, split_value, joined)
           VALUES (?, ?, '', NULL, 1)"#,
    )
    .bind(group_id)
    .bind(creator_email)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("inserting creator membership: {}", e)))?;

    Ok(group_id)
}

async fn update_transaction_group_in_tx(
    conn: &mut SqliteConnection,
    acting_email: &str,
    group_id: i64,
    patch: &UpdateTransactionGroupRequest,
) -> Result<(), AppError> {
    let group_row = sqlx::query(
        r#"SELECT name, split_type, currency_id, category_id, hidden
           FROM transaction_groups WHERE id = ?"#,
    )
    .bind(group_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("retrieving transaction group: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Transaction group {} not found", group_id)))?;

    let previous_members = sqlx::query(
        r#"SELECT user_email, user_name, split_value, joined
           FROM transaction_group_members
           WHERE transaction_group_id = ?"#,
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("getting previous transaction group members: {}", e)))?
    .iter()
    .map(member_from_row)
    .collect::<Vec<_>>();

    if !previous_members.iter().any(|m| m.email == acting_email) {
        return Err(AppError::NotAMember(
            "cannot update a transaction group you are not a part of".to_string(),
        ));
    }

    if let Patch::Set(desired_members) = &patch.members {
        let delta = reconcile::membership_delta(&previous_members, desired_members)?;

        // Removals before upserts, so a re-added email lands as a fresh row.
        for email in &delta.removals {
            let result = sqlx::query(
                "DELETE FROM transaction_group_members WHERE transaction_group_id = ? AND user_email = ?",
            )
            .bind(group_id)
            .bind(email)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::Database(format!(
                    "removing member from transaction group: {}: {}",
                    email, e
                ))
            })?;

            if result.rows_affected() != 1 {
                return Err(AppError::Database(format!(
                    "member did not get cleanly removed from transaction group: {}",
                    email
                )));
            }
        }

        // Upserts carry already-resolved weights and never touch the joined
        // flag.
        for member in &delta.upserts {
            let result = sqlx::query(
                r#"INSERT INTO transaction_group_members
                       (transaction_group_id, user_email, split_value, joined)
                   VALUES (?, ?, ?, 0)
                   ON CONFLICT(transaction_group_id, user_email)
                   DO UPDATE SET split_value = excluded.split_value"#,
            )
            .bind(group_id)
            .bind(&member.email)
            .bind(member.split_value)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::Database(format!("upserting transaction group member: {}", e))
            })?;

            if result.rows_affected() == 0 {
                return Err(AppError::Database(
                    "upserting transaction group member created no entry".to_string(),
                ));
            }
        }
    }

    let name = patch
        .name
        .clone()
        .resolve_required(group_row.get("name"));
    let split_type = match &patch.split_type {
        Patch::Set(split_type) => split_type.as_str().to_string(),
        _ => group_row.get("split_type"),
    };
    let currency_id = patch
        .currency_id
        .clone()
        .resolve(group_row.get("currency_id"));
    let category_id = patch
        .category_id
        .clone()
        .resolve(group_row.get("category_id"));
    let hidden = patch.hidden.clone().resolve_required(group_row.get("hidden"));

    let result = sqlx::query(
        r#"UPDATE transaction_groups
           SET name = ?, split_type = ?, currency_id = ?, category_id = ?, hidden = ?
           WHERE id = ?"#,
    )
    .bind(&name)
    .bind(&split_type)
    .bind(currency_id)
    .bind(category_id)
    .bind(hidden)
    .bind(group_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("updating transaction group: {}", e)))?;

    if result.rows_affected() == 0 {
        return Err(AppError::Database(
            "transaction group update returned no result".to_string(),
        ));
    }

    Ok(())
}

async fn create_transaction_in_tx(
    conn: &mut SqliteConnection,
    owner_email: &str,
    request: &CreateTransactionRequest,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"INSERT INTO transactions
               (owner_email, amount, currency_id, sender_account_id, receiver_account_id,
                category_id, date, note, receiver_currency_id, receiver_amount)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(owner_email)
    .bind(request.amount)
    .bind(request.currency_id)
    .bind(request.sender_account_id)
    .bind(request.receiver_account_id)
    .bind(request.category_id)
    .bind(request.date)
    .bind(&request.note)
    .bind(request.receiver_currency_id)
    .bind(request.receiver_amount)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("creating transaction: {}", e)))?;

    let transaction_id = result.last_insert_rowid();

    if let Some(financial_income) = &request.financial_income {
        sqlx::query(
            r#"INSERT INTO financial_income (transaction_id, related_currency_id)
               VALUES (?, ?)
               ON CONFLICT(transaction_id)
               DO UPDATE SET related_currency_id = excluded.related_currency_id"#,
        )
        .bind(transaction_id)
        .bind(financial_income.related_currency_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::Database(format!("creating financial income: {}", e)))?;
    }

    if let Some(grouped) = &request.grouped_data {
        check_group_exists(conn, grouped.transaction_group_id).await?;

        let split_type = grouped
            .split_override
            .as_ref()
            .map(|o| o.split_type.as_str());

        sqlx::query(
            r#"INSERT INTO grouped_transactions
                   (transaction_id, transaction_group_id, split_type_override, triggered_by_owner)
               VALUES (?, ?, ?, 1)"#,
        )
        .bind(transaction_id)
        .bind(grouped.transaction_group_id)
        .bind(split_type)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::Database(format!("upserting grouped transaction: {}", e)))?;

        if let Some(split_override) = &grouped.split_override {
            for member in &split_override.members {
                upsert_override_value(conn, transaction_id, member).await?;
            }
        }
    }

    Ok(transaction_id)
}

async fn update_transaction_in_tx(
    conn: &mut SqliteConnection,
    acting_email: &str,
    transaction_id: i64,
    patch: &UpdateTransactionRequest,
) -> Result<(), AppError> {
    let existing = sqlx::query(
        r#"SELECT t.owner_email, t.amount, t.currency_id, t.sender_account_id,
                  t.receiver_account_id, t.category_id, t.date, t.note,
                  t.receiver_currency_id, t.receiver_amount,
                  f.related_currency_id,
                  g.transaction_group_id, g.split_type_override
           FROM transactions t
           LEFT JOIN financial_income f ON f.transaction_id = t.id
           LEFT JOIN grouped_transactions g ON g.transaction_id = t.id
           WHERE t.id = ?"#,
    )
    .bind(transaction_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("getting previous transaction: {}", e)))?
    .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", transaction_id)))?;

    let owner_email: String = existing.get("owner_email");
    let is_owner = owner_email == acting_email;

    // Scalar fields only apply to the owner's row; a non-owner participant
    // can still reconcile the grouped part below.
    let amount = patch.amount.clone().resolve_required(existing.get("amount"));
    let currency_id = patch
        .currency_id
        .clone()
        .resolve_required(existing.get("currency_id"));
    let receiver_amount = patch
        .receiver_amount
        .clone()
        .resolve_required(existing.get("receiver_amount"));
    let receiver_currency_id = patch
        .receiver_currency_id
        .clone()
        .resolve_required(existing.get("receiver_currency_id"));
    let sender_account_id = patch
        .sender_account_id
        .clone()
        .resolve(existing.get("sender_account_id"));
    let receiver_account_id = patch
        .receiver_account_id
        .clone()
        .resolve(existing.get("receiver_account_id"));
    let category_id = patch
        .category_id
        .clone()
        .resolve(existing.get("category_id"));
    let date = patch
        .date
        .clone()
        .resolve_required(existing.get("date"));
    let note = match &patch.note {
        Patch::Set(note) => note.clone(),
        Patch::Clear => String::new(),
        Patch::Unset => existing.get("note"),
    };

    sqlx::query(
        r#"UPDATE transactions
           SET amount = ?, currency_id = ?, sender_account_id = ?, receiver_account_id = ?,
               category_id = ?, date = ?, note = ?, receiver_currency_id = ?, receiver_amount = ?
           WHERE id = ? AND owner_email = ?"#,
    )
    .bind(amount)
    .bind(currency_id)
    .bind(sender_account_id)
    .bind(receiver_account_id)
    .bind(category_id)
    .bind(date)
    .bind(&note)
    .bind(receiver_currency_id)
    .bind(receiver_amount)
    .bind(transaction_id)
    .bind(acting_email)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("updating transaction: {}", e)))?;

    match &patch.financial_income {
        Patch::Unset => {}
        Patch::Clear => {
            sqlx::query("DELETE FROM financial_income WHERE transaction_id = ?")
                .bind(transaction_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| AppError::Database(format!("deleting financial income: {}", e)))?;
        }
        Patch::Set(financial_patch) => {
            let related_currency_id = financial_patch
                .related_currency_id
                .clone()
                .resolve(existing.get("related_currency_id"))
                .ok_or_else(|| {
                    AppError::Validation("related currency id is required".to_string())
                })?;

            sqlx::query(
                r#"INSERT INTO financial_income (transaction_id, related_currency_id)
                   VALUES (?, ?)
                   ON CONFLICT(transaction_id)
                   DO UPDATE SET related_currency_id = excluded.related_currency_id"#,
            )
            .bind(transaction_id)
            .bind(related_currency_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::Database(format!("updating financial income: {}", e)))?;
        }
    }

    match &patch.grouped_data {
        Patch::Unset => {}
        Patch::Clear => {
            sqlx::query("DELETE FROM grouped_transactions WHERE transaction_id = ?")
                .bind(transaction_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    AppError::Database(format!("deleting grouped transaction data: {}", e))
                })?;

            sqlx::query("DELETE FROM grouped_transaction_member_values WHERE transaction_id = ?")
                .bind(transaction_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    AppError::Database(format!("deleting member split values: {}", e))
                })?;
        }
        Patch::Set(grouped_patch) => {
            let previous_group_id: Option<i64> = existing.get("transaction_group_id");
            let target_group_id = match &grouped_patch.transaction_group_id {
                Patch::Set(group_id) => *group_id,
                _ => previous_group_id.ok_or_else(|| {
                    AppError::Validation(
                        "transaction group id is required to attach a transaction to a group"
                            .to_string(),
                    )
                })?,
            };
            check_group_exists(conn, target_group_id).await?;

            let previous_split_type: Option<String> = existing.get("split_type_override");
            let split_type = match &grouped_patch.split_override {
                Patch::Unset => previous_split_type,
                Patch::Clear => None,
                Patch::Set(override_patch) => match &override_patch.split_type {
                    Patch::Set(split_type) => Some(split_type.as_str().to_string()),
                    Patch::Unset => previous_split_type,
                    Patch::Clear => None,
                },
            };

            sqlx::query(
                r#"INSERT INTO grouped_transactions
                       (transaction_id, transaction_group_id, split_type_override, triggered_by_owner)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT(transaction_id)
                   DO UPDATE SET transaction_group_id = excluded.transaction_group_id,
                                 split_type_override = excluded.split_type_override,
                                 triggered_by_owner = excluded.triggered_by_owner"#,
            )
            .bind(transaction_id)
            .bind(target_group_id)
            .bind(&split_type)
            .bind(is_owner)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::Database(format!("upserting grouped transaction: {}", e)))?;

            let desired_values = match &grouped_patch.split_override {
                // Stored values stay as they are.
                Patch::Unset => None,
                Patch::Clear => Some(Vec::new()),
                Patch::Set(override_patch) => match &override_patch.members {
                    Patch::Unset => None,
                    Patch::Clear => Some(Vec::new()),
                    Patch::Set(members) => Some(members.clone()),
                },
            };

            if let Some(desired) = desired_values {
                let previous = sqlx::query(
                    r#"SELECT user_email, split_value
                       FROM grouped_transaction_member_values
                       WHERE transaction_id = ?"#,
                )
                .bind(transaction_id)
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| {
                    AppError::Database(format!("getting previous member split values: {}", e))
                })?
                .iter()
                .map(override_value_from_row)
                .collect::<Vec<_>>();

                let delta = reconcile::override_delta(&previous, &desired)?;

                for email in &delta.removals {
                    sqlx::query(
                        "DELETE FROM grouped_transaction_member_values WHERE transaction_id = ? AND user_email = ?",
                    )
                    .bind(transaction_id)
                    .bind(email)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        AppError::Database(format!(
                            "removing member split value from transaction: {}: {}",
                            email, e
                        ))
                    })?;
                }

                for member in &delta.upserts {
                    upsert_override_value(conn, transaction_id, member).await?;
                }
            }
        }
    }

    Ok(())
}

async fn upsert_override_value(
    conn: &mut SqliteConnection,
    transaction_id: i64,
    member: &MemberSplitValue,
) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO grouped_transaction_member_values (transaction_id, user_email, split_value)
           VALUES (?, ?, ?)
           ON CONFLICT(transaction_id, user_email)
           DO UPDATE SET split_value = excluded.split_value"#,
    )
    .bind(transaction_id)
    .bind(&member.email)
    .bind(member.split_value)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("upserting member split value: {}", e)))?;

    Ok(())
}

// ==================== ROW MAPPING ====================

fn currency_from_row(row: &SqliteRow) -> Currency {
    Currency {
        id: row.get("id"),
        owner_email: row.get("owner_email"),
        name: row.get("name"),
    }
}

fn category_from_row(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        owner_email: row.get("owner_email"),
        name: row.get("name"),
    }
}

fn member_from_row(row: &SqliteRow) -> Member {
    let email: String = row.get("user_email");
    let name: String = row.get("user_name");

    Member {
        name: if name.is_empty() { email.clone() } else { name },
        email,
        split_value: row.get("split_value"),
        joined: row.get("joined"),
    }
}

fn override_value_from_row(row: &SqliteRow) -> MemberSplitValue {
    MemberSplitValue {
        email: row.get("user_email"),
        split_value: row.get("split_value"),
    }
}
