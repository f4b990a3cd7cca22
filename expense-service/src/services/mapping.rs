//! Column mapping detection and validation.
//!
//! The detector proposes a best-effort mapping from internal expense fields
//! to board columns; the validator gates every sync pass on the mapping still
//! matching the live board. Neither ever guesses a field into a column of the
//! wrong type.

use crate::models::{
    BoardColumn, ColumnMapping, ColumnType, ExpenseField, FieldResolution, MappedColumn,
};
use serde::Serialize;

/// Title keywords per field, checked case-insensitively. The board labels are
/// free text and the original boards are Spanish-first, so both languages are
/// covered.
fn title_keywords(field: ExpenseField) -> &'static [&'static str] {
    match field {
        ExpenseField::Amount => &["monto", "importe", "amount", "total", "costo", "cost"],
        ExpenseField::Status => &["estado", "status"],
        ExpenseField::Category => &["categoria", "categoría", "category", "tipo", "type"],
        ExpenseField::Date => &["fecha", "date"],
        ExpenseField::Vendor => &["proveedor", "vendor", "comercio", "merchant"],
        ExpenseField::Notes => &["notas", "notes", "descripcion", "descripción", "description"],
    }
}

/// Column types a field may map to. This is a hard filter: a field is never
/// mapped to an incompatible column no matter how well the title matches.
fn compatible_types(field: ExpenseField) -> &'static [ColumnType] {
    match field {
        ExpenseField::Amount => &[ColumnType::Numbers],
        ExpenseField::Status => &[ColumnType::Status],
        ExpenseField::Category => &[ColumnType::Dropdown, ColumnType::Status],
        ExpenseField::Date => &[ColumnType::Date],
        ExpenseField::Vendor => &[ColumnType::Text],
        ExpenseField::Notes => &[ColumnType::Text, ColumnType::LongText],
    }
}

fn is_compatible(field: ExpenseField, column_type: &ColumnType) -> bool {
    compatible_types(field).contains(column_type)
}

/// Title similarity score. Exact title match outranks a keyword hit; a zero
/// score never maps.
fn title_score(field: ExpenseField, title: &str) -> u32 {
    let title = title.trim().to_lowercase();
    let keywords = title_keywords(field);

    if keywords.iter().any(|k| title == *k) {
        return 2;
    }
    if keywords.iter().any(|k| title.contains(k)) {
        return 1;
    }
    0
}

/// Propose a mapping from internal expense fields to board columns.
///
/// For each field, every column is scored by type compatibility (hard filter)
/// and title similarity; the highest-scoring column wins, ties broken by
/// declaration order (first wins). Fields with no scoring compatible column
/// are left unmapped. Never fails: an absent mapping is representable and the
/// caller decides whether to proceed.
pub fn detect_mapping(columns: &[BoardColumn]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();

    for field in ExpenseField::ALL {
        let mut best: Option<(u32, &BoardColumn)> = None;

        for column in columns {
            if !is_compatible(field, &column.column_type) {
                continue;
            }
            let score = title_score(field, &column.title);
            if score == 0 {
                continue;
            }
            // Strictly-greater keeps the first column on ties.
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, column));
            }
        }

        if let Some((score, column)) = best {
            tracing::debug!(
                field = field.as_str(),
                column_id = %column.id,
                column_title = %column.title,
                score,
                "Detected column mapping"
            );
            mapping.set(
                field,
                MappedColumn {
                    column_id: column.id.clone(),
                    column_type: column.column_type.clone(),
                },
            );
        }
    }

    mapping
}

/// Per-field resolution flags for the fields a sync cannot run without.
pub fn required_fields_resolved(mapping: &ColumnMapping) -> Vec<FieldResolution> {
    ExpenseField::REQUIRED
        .iter()
        .map(|f| FieldResolution {
            field: f.as_str().to_string(),
            resolved: mapping.get(*f).is_some(),
        })
        .collect()
}

/// One specific reason a mapping cannot be synced against the board.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct MappingViolation {
    pub field: String,
    pub reason: String,
}

/// Outcome of validating a mapping against the board's live column list.
#[derive(Debug, Serialize, Clone)]
pub struct MappingValidation {
    pub valid: bool,
    pub violations: Vec<MappingViolation>,
}

/// Validate a proposed mapping against the board's current columns.
///
/// Checks that every referenced column still exists, that every mapped
/// field's column type is compatible, that no two fields share a column, and
/// that every required field resolves to a column. This gate runs before
/// every sync; a sync must refuse to run against an invalid mapping.
pub fn validate_mapping(mapping: &ColumnMapping, columns: &[BoardColumn]) -> MappingValidation {
    let mut violations = Vec::new();

    for (field, mapped) in mapping.iter() {
        match columns.iter().find(|c| c.id == mapped.column_id) {
            None => violations.push(MappingViolation {
                field: field.as_str().to_string(),
                reason: format!("column '{}' no longer exists on the board", mapped.column_id),
            }),
            Some(column) => {
                if !is_compatible(field, &column.column_type) {
                    violations.push(MappingViolation {
                        field: field.as_str().to_string(),
                        reason: format!(
                            "column '{}' has type '{}', incompatible with field '{}'",
                            column.id,
                            column.column_type.as_str(),
                            field.as_str()
                        ),
                    });
                }
            }
        }
    }

    // No two fields may share one column.
    let mapped: Vec<(ExpenseField, &MappedColumn)> = mapping.iter().collect();
    for (i, (field, column)) in mapped.iter().enumerate() {
        for (other_field, other_column) in mapped.iter().skip(i + 1) {
            if column.column_id == other_column.column_id {
                violations.push(MappingViolation {
                    field: other_field.as_str().to_string(),
                    reason: format!(
                        "column '{}' is already mapped to field '{}'",
                        column.column_id,
                        field.as_str()
                    ),
                });
            }
        }
    }

    // A sync cannot run without its required fields; an unresolved one is a
    // violation, not a warning.
    for resolution in required_fields_resolved(mapping) {
        if !resolution.resolved {
            violations.push(MappingViolation {
                field: resolution.field,
                reason: "required field is not mapped to any column".to_string(),
            });
        }
    }

    MappingValidation {
        valid: violations.is_empty(),
        violations,
    }
}
