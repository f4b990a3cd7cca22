//! Domain models for expense-service.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Expense Models
// ============================================================================

/// Internal, canonical expense record.
///
/// At most one expense maps to a given board item within a company scope;
/// the store enforces uniqueness on `(company_id, external_item_id)`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub company_id: String,
    pub user_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub category: ExpenseCategory,
    pub status: ExpenseStatus,
    /// Identifier of the board item this expense was synced from.
    pub external_item_id: Option<String>,
    pub expense_date: Option<chrono::NaiveDate>,
    pub vendor: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl Default for ExpenseStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Travel,
    Meals,
    Supplies,
    Other,
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        Self::Other
    }
}

/// Field-level change set produced by the merge engine.
///
/// Carries only the reconciled fields that actually differ; fields left as
/// `None` are not written. The merge is one-directional (board to internal)
/// and never touches internal-only fields.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct ExpenseDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExpenseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_date: Option<chrono::NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ExpenseDelta {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.status.is_none()
            && self.category.is_none()
            && self.expense_date.is_none()
            && self.vendor.is_none()
            && self.notes.is_none()
    }
}

// ============================================================================
// Company Models
// ============================================================================

/// Company record carrying the board configuration and last-sync summary.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: String,
    pub board_id: Option<String>,
    pub column_mapping: Option<ColumnMapping>,
    pub last_sync_at: Option<DateTime>,
    pub last_sync_counts: Option<SyncCounts>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub items_processed: u64,
    pub items_created: u64,
    pub items_updated: u64,
}

// ============================================================================
// Board Column Models
// ============================================================================

/// Column type as declared by the board API.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Status,
    Dropdown,
    Numbers,
    Date,
    Text,
    LongText,
    People,
    Other(String),
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Status => "status",
            Self::Dropdown => "dropdown",
            Self::Numbers => "numbers",
            Self::Date => "date",
            Self::Text => "text",
            Self::LongText => "long_text",
            Self::People => "people",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ColumnType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "status" => Self::Status,
            "dropdown" => Self::Dropdown,
            "numbers" | "numeric" => Self::Numbers,
            "date" => Self::Date,
            "text" => Self::Text,
            "long_text" | "long-text" => Self::LongText,
            "people" | "person" => Self::People,
            _ => Self::Other(s),
        }
    }
}

impl From<ColumnType> for String {
    fn from(t: ColumnType) -> Self {
        t.as_str().to_string()
    }
}

/// A column discovered on the external board.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardColumn {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// One board item as pulled from the external API.
///
/// A read-only snapshot per sync pass; never mutated locally, only
/// transformed into a candidate expense.
#[derive(Debug, Deserialize, Clone)]
pub struct BoardItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub column_values: Vec<ColumnValue>,
}

/// Raw column value pair on a board item. `value` is a JSON-encoded
/// structured value whose shape depends on the declared column type.
#[derive(Debug, Deserialize, Clone)]
pub struct ColumnValue {
    pub id: String,
    pub text: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub column_type: Option<ColumnType>,
}

// ============================================================================
// Column Mapping
// ============================================================================

/// Internal expense fields that can be reconciled from board columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseField {
    Amount,
    Status,
    Category,
    Date,
    Vendor,
    Notes,
}

impl ExpenseField {
    pub const ALL: [ExpenseField; 6] = [
        Self::Amount,
        Self::Status,
        Self::Category,
        Self::Date,
        Self::Vendor,
        Self::Notes,
    ];

    /// Fields a sync cannot run without.
    pub const REQUIRED: [ExpenseField; 2] = [Self::Amount, Self::Status];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Status => "status",
            Self::Category => "category",
            Self::Date => "date",
            Self::Vendor => "vendor",
            Self::Notes => "notes",
        }
    }
}

/// One resolved association between an internal field and a board column.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MappedColumn {
    pub column_id: String,
    pub column_type: ColumnType,
}

/// Admin-confirmed mapping from internal expense fields to board columns.
///
/// Partial by design: unmapped fields are skipped during reconciliation and
/// reported as warnings, never guessed.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<MappedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MappedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MappedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<MappedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<MappedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<MappedColumn>,
}

impl ColumnMapping {
    pub fn get(&self, field: ExpenseField) -> Option<&MappedColumn> {
        match field {
            ExpenseField::Amount => self.amount.as_ref(),
            ExpenseField::Status => self.status.as_ref(),
            ExpenseField::Category => self.category.as_ref(),
            ExpenseField::Date => self.date.as_ref(),
            ExpenseField::Vendor => self.vendor.as_ref(),
            ExpenseField::Notes => self.notes.as_ref(),
        }
    }

    pub fn set(&mut self, field: ExpenseField, mapped: MappedColumn) {
        let slot = match field {
            ExpenseField::Amount => &mut self.amount,
            ExpenseField::Status => &mut self.status,
            ExpenseField::Category => &mut self.category,
            ExpenseField::Date => &mut self.date,
            ExpenseField::Vendor => &mut self.vendor,
            ExpenseField::Notes => &mut self.notes,
        };
        *slot = Some(mapped);
    }

    /// Iterate mapped fields in canonical field order.
    pub fn iter(&self) -> impl Iterator<Item = (ExpenseField, &MappedColumn)> {
        ExpenseField::ALL
            .iter()
            .filter_map(|f| self.get(*f).map(|m| (*f, m)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

// ============================================================================
// Sync & Verification Results
// ============================================================================

/// Aggregated outcome of one sync pass.
#[derive(Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub items_processed: u64,
    pub items_created: u64,
    pub items_updated: u64,
    /// Per-item error strings, in pagination order.
    pub errors: Vec<String>,
}

impl SyncResult {
    pub fn counts(&self) -> SyncCounts {
        SyncCounts {
            items_processed: self.items_processed,
            items_created: self.items_created,
            items_updated: self.items_updated,
        }
    }
}

/// Resolution flag for one field a sync cannot run without.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct FieldResolution {
    pub field: String,
    pub resolved: bool,
}

/// Outcome of verifying a board configuration, surfaced to the admin before
/// any sync runs against it.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BoardVerificationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_name: Option<String>,
    pub columns: Vec<BoardColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_mapping: Option<ColumnMapping>,
    /// Whether the suggested mapping resolves each required field; the admin
    /// must fill the gaps before a sync will accept the mapping.
    pub required_fields: Vec<FieldResolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BoardVerificationResult {
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            board_name: None,
            columns: Vec::new(),
            suggested_mapping: None,
            required_fields: Vec::new(),
            error: Some(error.into()),
        }
    }
}
