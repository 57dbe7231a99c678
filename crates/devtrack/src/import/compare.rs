use super::cell::{is_truthy, CellValue};

const NUMERIC_TOLERANCE: f64 = 1e-9;

/// Decide whether a stored value and an incoming spreadsheet value differ.
///
/// Coercion order: empty-equivalence, then yes/no tokens against booleans,
/// then numeric comparison when either side is a number, then trimmed text.
pub fn values_differ(old: &CellValue, new: &CellValue) -> bool {
    if old.is_empty() && new.is_empty() {
        return false;
    }

    match (old, new) {
        (CellValue::Bool(left), other) | (other, CellValue::Bool(left))
            if !matches!(other, CellValue::Bool(_) | CellValue::Number(_)) =>
        {
            *left != token_flag(other)
        }
        (CellValue::Bool(left), CellValue::Bool(right)) => left != right,
        (CellValue::Number(_), _) | (_, CellValue::Number(_)) => {
            match (numeric(old), numeric(new)) {
                (Some(left), Some(right)) => (left - right).abs() > NUMERIC_TOLERANCE,
                _ => true,
            }
        }
        _ => old.as_trimmed_text() != new.as_trimmed_text(),
    }
}

/// Booleans count as 1 and 0 when compared against a number.
fn numeric(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        other => other.as_number(),
    }
}

fn token_flag(value: &CellValue) -> bool {
    match value {
        CellValue::Text(text) => is_truthy(text),
        _ => false,
    }
}
