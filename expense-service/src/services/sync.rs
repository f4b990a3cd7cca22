//! Diff/merge engine and sync orchestration.
//!
//! One sync pass pulls every board item, transforms each into a candidate
//! expense, diffs it against the stored record keyed on
//! `(company_id, external_item_id)` and writes the minimal create/update.
//! Per-item failures are collected; only total failure to reach the board
//! API aborts the pass.

use crate::models::{
    ColumnMapping, Expense, ExpenseCategory, ExpenseDelta, ExpenseStatus, SyncResult,
};
use crate::services::mapping::validate_mapping;
use crate::services::monday::MondayClient;
use crate::services::repository::ExpenseStore;
use crate::services::transform::{item_to_candidate, CandidateExpense};
use crate::services::metrics;
use mongodb::bson::DateTime;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Reconciliation decision for one candidate against the stored record.
#[derive(Debug, Clone)]
pub enum SyncAction {
    Create(Expense),
    Update(ExpenseDelta),
    Noop,
}

/// Classify one candidate against the matching stored expense, if any.
///
/// Only reconciled fields (those the candidate actually carries) are
/// compared; identical values classify as `Noop`, never as an update.
pub fn classify(candidate: &CandidateExpense, existing: Option<&Expense>, company_id: &str) -> SyncAction {
    let Some(existing) = existing else {
        return SyncAction::Create(new_expense_from_candidate(candidate, company_id));
    };

    let mut delta = ExpenseDelta::default();

    if let Some(amount) = candidate.amount {
        if amount != existing.amount {
            delta.amount = Some(amount);
        }
    }
    if let Some(status) = candidate.status {
        if status != existing.status {
            delta.status = Some(status);
        }
    }
    if let Some(category) = candidate.category {
        if category != existing.category {
            delta.category = Some(category);
        }
    }
    if let Some(date) = candidate.expense_date {
        if existing.expense_date != Some(date) {
            delta.expense_date = Some(date);
        }
    }
    if let Some(ref vendor) = candidate.vendor {
        if existing.vendor.as_deref() != Some(vendor.as_str()) {
            delta.vendor = Some(vendor.clone());
        }
    }
    if let Some(ref notes) = candidate.notes {
        if existing.notes.as_deref() != Some(notes.as_str()) {
            delta.notes = Some(notes.clone());
        }
    }

    if delta.is_empty() {
        SyncAction::Noop
    } else {
        SyncAction::Update(delta)
    }
}

/// Materialize a new expense from a candidate, defaults filling the
/// unreconciled fields.
fn new_expense_from_candidate(candidate: &CandidateExpense, company_id: &str) -> Expense {
    let now = DateTime::now();
    Expense {
        id: Uuid::new_v4(),
        company_id: company_id.to_string(),
        user_id: None,
        amount: candidate.amount.unwrap_or(0.0),
        currency: "USD".to_string(),
        category: candidate.category.unwrap_or(ExpenseCategory::Other),
        status: candidate.status.unwrap_or(ExpenseStatus::Pending),
        external_item_id: Some(candidate.external_item_id.clone()),
        expense_date: candidate.expense_date,
        vendor: candidate.vendor.clone(),
        notes: candidate.notes.clone(),
        created_at: now,
        updated_at: now,
    }
}

/// Runs one sync pass end-to-end for a company.
#[derive(Clone)]
pub struct SyncEngine {
    monday: MondayClient,
    store: Arc<dyn ExpenseStore>,
}

impl SyncEngine {
    pub fn new(monday: MondayClient, store: Arc<dyn ExpenseStore>) -> Self {
        Self { monday, store }
    }

    /// Run one sync pass.
    ///
    /// An explicit mapping overrides the stored one and, once it has
    /// validated against the live board, replaces it. A mapping that fails
    /// validation refuses the pass before any write.
    pub async fn run_sync(
        &self,
        company_id: &str,
        explicit_mapping: Option<ColumnMapping>,
    ) -> Result<SyncResult, AppError> {
        let company = self.store.get_company(company_id).await?;

        let board_id = company
            .as_ref()
            .and_then(|c| c.board_id.clone())
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Company {} has no board configured",
                    company_id
                ))
            })?;

        let mapping_was_explicit = explicit_mapping.is_some();
        let mapping = explicit_mapping
            .or_else(|| company.and_then(|c| c.column_mapping))
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Company {} has no column mapping; verify the board first",
                    company_id
                ))
            })?;

        // The mapping gate runs against the live column list on every pass:
        // zero writes happen against a stale or ill-typed mapping.
        let (_, columns) = self.monday.get_board(&board_id).await?;
        let validation = validate_mapping(&mapping, &columns);
        if !validation.valid {
            let reasons: Vec<String> = validation
                .violations
                .iter()
                .map(|v| format!("{}: {}", v.field, v.reason))
                .collect();
            metrics::record_sync_pass(company_id, "refused");
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Column mapping is invalid: {}",
                reasons.join("; ")
            )));
        }

        if mapping_was_explicit {
            self.store.save_column_mapping(company_id, &mapping).await?;
        }

        let items = match self.monday.fetch_items(&board_id).await {
            Ok(items) => items,
            Err(e) => {
                metrics::record_sync_pass(company_id, "failed");
                return Err(e);
            }
        };

        let mut result = SyncResult::default();

        for item in &items {
            result.items_processed += 1;

            let candidate = match item_to_candidate(item, &mapping) {
                Ok(candidate) => candidate,
                Err(e) => {
                    tracing::warn!(item_id = %e.item_id, reason = %e.reason, "Item transform failed");
                    result.errors.push(e.to_string());
                    continue;
                }
            };

            for warning in &candidate.warnings {
                tracing::debug!(item_id = %item.id, warning = %warning, "Transform warning");
            }

            if let Err(e) = self.reconcile_item(company_id, &candidate, &mut result).await {
                tracing::warn!(item_id = %item.id, error = %e, "Item write failed");
                result
                    .errors
                    .push(format!("item {}: {}", item.id, e));
            }
        }

        self.store
            .record_sync(company_id, result.counts(), DateTime::now())
            .await?;

        metrics::record_sync_pass(company_id, "completed");
        tracing::info!(
            company_id = %company_id,
            items_processed = result.items_processed,
            items_created = result.items_created,
            items_updated = result.items_updated,
            errors = result.errors.len(),
            "Sync pass completed"
        );

        Ok(result)
    }

    /// Diff one candidate against the store and apply the minimal write.
    async fn reconcile_item(
        &self,
        company_id: &str,
        candidate: &CandidateExpense,
        result: &mut SyncResult,
    ) -> Result<(), AppError> {
        let existing = self
            .store
            .find_by_external_id(company_id, &candidate.external_item_id)
            .await?;

        match classify(candidate, existing.as_ref(), company_id) {
            SyncAction::Create(expense) => {
                self.store.insert_expense(expense).await?;
                result.items_created += 1;
                metrics::record_sync_item(company_id, "created");
            }
            SyncAction::Update(delta) => {
                self.store
                    .apply_delta(company_id, &candidate.external_item_id, &delta)
                    .await?;
                result.items_updated += 1;
                metrics::record_sync_item(company_id, "updated");
            }
            SyncAction::Noop => {
                metrics::record_sync_item(company_id, "noop");
            }
        }

        Ok(())
    }
}
