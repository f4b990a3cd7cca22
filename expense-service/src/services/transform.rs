//! Board item to candidate expense transformation.
//!
//! Each mapped field is parsed according to its column's declared type.
//! Unmapped fields stay at internal defaults and are recorded as warnings;
//! only a malformed value in a mapped amount or date column fails the item.

use crate::models::{
    BoardItem, ColumnMapping, ColumnValue, ExpenseCategory, ExpenseField, ExpenseStatus,
};
use chrono::NaiveDate;

/// Date format the board's date columns carry.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parsed-but-not-yet-persisted expense derived from one board item.
///
/// `None` in a field means the field was not reconciled (unmapped or empty on
/// the board) and must not be touched during merge.
#[derive(Debug, Clone, Default)]
pub struct CandidateExpense {
    pub external_item_id: String,
    pub item_name: String,
    pub amount: Option<f64>,
    pub status: Option<ExpenseStatus>,
    pub category: Option<ExpenseCategory>,
    pub expense_date: Option<NaiveDate>,
    pub vendor: Option<String>,
    pub notes: Option<String>,
    /// Non-fatal conditions recorded while parsing this item.
    pub warnings: Vec<String>,
}

/// A single item's transformation failure. Collected into the sync's error
/// list; never aborts the pass.
#[derive(Debug, Clone)]
pub struct TransformError {
    pub item_id: String,
    pub reason: String,
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item {}: {}", self.item_id, self.reason)
    }
}

/// Convert one board item plus a validated mapping into a candidate expense.
pub fn item_to_candidate(
    item: &BoardItem,
    mapping: &ColumnMapping,
) -> Result<CandidateExpense, TransformError> {
    let mut candidate = CandidateExpense {
        external_item_id: item.id.clone(),
        item_name: item.name.clone(),
        ..Default::default()
    };

    for field in ExpenseField::ALL {
        let Some(mapped) = mapping.get(field) else {
            candidate
                .warnings
                .push(format!("field '{}' is unmapped, left at default", field.as_str()));
            continue;
        };

        let Some(raw) = column_text(item, &mapped.column_id) else {
            // Mapped column carries no value on this item.
            continue;
        };

        match field {
            ExpenseField::Amount => {
                let parsed = parse_amount(&raw).ok_or_else(|| TransformError {
                    item_id: item.id.clone(),
                    reason: format!("unparsable amount '{}'", raw),
                })?;
                candidate.amount = Some(parsed);
            }
            ExpenseField::Status => {
                let (status, known) = parse_status(&raw);
                if !known {
                    candidate.warnings.push(format!(
                        "unknown status label '{}', defaulting to pending",
                        raw
                    ));
                }
                candidate.status = Some(status);
            }
            ExpenseField::Category => {
                let (category, known) = parse_category(&raw);
                if !known {
                    candidate.warnings.push(format!(
                        "unknown category label '{}', defaulting to other",
                        raw
                    ));
                }
                candidate.category = Some(category);
            }
            ExpenseField::Date => {
                let parsed =
                    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
                        TransformError {
                            item_id: item.id.clone(),
                            reason: format!("unparsable date '{}', expected {}", raw, DATE_FORMAT),
                        }
                    })?;
                candidate.expense_date = Some(parsed);
            }
            ExpenseField::Vendor => candidate.vendor = Some(raw),
            ExpenseField::Notes => candidate.notes = Some(raw),
        }
    }

    Ok(candidate)
}

/// Display text of a column value on an item, if present and non-empty.
fn column_text(item: &BoardItem, column_id: &str) -> Option<String> {
    item.column_values
        .iter()
        .find(|cv| cv.id == column_id)
        .and_then(ColumnValue::display_text)
}

impl ColumnValue {
    /// Best-available textual representation of the raw value.
    fn display_text(&self) -> Option<String> {
        let text = self.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }
        Some(text.to_string())
    }
}

/// Parse a numeric amount with locale-aware decimal handling.
///
/// Accepts `1234.56`, `1.234,56` and `1,50`; currency symbols and spaces are
/// stripped before parsing.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let normalized = match (last_dot, last_comma) {
        // Both separators present: the rightmost one is the decimal point.
        (Some(d), Some(c)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        // Comma only: decimal comma unless it reads as a thousands group.
        (None, Some(c)) => {
            let decimals = cleaned.len() - c - 1;
            if decimals == 3 && cleaned.matches(',').count() == 1 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Translate a status label into the internal status enum. The boolean is
/// false when the label had no table entry and the default was used.
pub fn parse_status(raw: &str) -> (ExpenseStatus, bool) {
    match raw.trim().to_lowercase().as_str() {
        "pendiente" | "pending" | "nuevo" | "new" => (ExpenseStatus::Pending, true),
        "en progreso" | "en proceso" | "in progress" | "working on it" => {
            (ExpenseStatus::InProgress, true)
        }
        "listo" | "hecho" | "done" | "completed" | "aprobado" | "approved" => {
            (ExpenseStatus::Completed, true)
        }
        "rechazado" | "rejected" | "declined" => (ExpenseStatus::Rejected, true),
        _ => (ExpenseStatus::Pending, false),
    }
}

/// Translate a category label into the internal category enum. The boolean is
/// false when the label had no table entry and the default was used.
pub fn parse_category(raw: &str) -> (ExpenseCategory, bool) {
    match raw.trim().to_lowercase().as_str() {
        "viaje" | "viajes" | "travel" | "transporte" | "transport" => {
            (ExpenseCategory::Travel, true)
        }
        "comida" | "comidas" | "meals" | "alimentos" => (ExpenseCategory::Meals, true),
        "insumos" | "supplies" | "materiales" | "oficina" => (ExpenseCategory::Supplies, true),
        "otro" | "otros" | "other" => (ExpenseCategory::Other, true),
        _ => (ExpenseCategory::Other, false),
    }
}
