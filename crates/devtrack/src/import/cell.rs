use serde::{Deserialize, Serialize};
use std::fmt;

/// A single spreadsheet value after decoding, independent of the file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Blank text and missing cells collapse into one "empty" state.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(value) => value.trim().is_empty(),
            CellValue::Bool(_) | CellValue::Number(_) => false,
        }
    }

    pub fn from_optional_text(value: Option<&str>) -> Self {
        match value {
            Some(text) if !text.trim().is_empty() => Self::Text(text.trim().to_string()),
            _ => Self::Empty,
        }
    }

    pub fn from_optional_number(value: Option<f64>) -> Self {
        value.map(Self::Number).unwrap_or(Self::Empty)
    }

    /// Interpret the value as a number, tolerating currency symbols and grouping commas.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            CellValue::Text(value) => parse_number(value),
            CellValue::Bool(_) | CellValue::Empty => None,
        }
    }

    /// Interpret the value as a yes/no flag.
    pub fn as_flag(&self) -> bool {
        match self {
            CellValue::Bool(value) => *value,
            CellValue::Number(value) => (*value - 1.0).abs() < f64::EPSILON,
            CellValue::Text(value) => is_truthy(value),
            CellValue::Empty => false,
        }
    }

    pub fn as_trimmed_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(value) => value.trim().to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(true) => f.write_str("Yes"),
            CellValue::Bool(false) => f.write_str("No"),
            CellValue::Number(value) => {
                if value.fract() == 0.0 && value.abs() < 1e15 {
                    write!(f, "{}", *value as i64)
                } else {
                    write!(f, "{value}")
                }
            }
            CellValue::Text(value) => f.write_str(value),
        }
    }
}

pub(crate) fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "1"
    )
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, '€' | '£' | '$' | ',') && !ch.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|number| number.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_parsing_strips_currency_and_grouping() {
        assert_eq!(CellValue::text("€ 325,000").as_number(), Some(325_000.0));
        assert_eq!(CellValue::text("12.5").as_number(), Some(12.5));
        assert_eq!(CellValue::text("three").as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn display_drops_trailing_zero_fraction() {
        assert_eq!(CellValue::Number(100000.0).to_string(), "100000");
        assert_eq!(CellValue::Number(82.5).to_string(), "82.5");
        assert_eq!(CellValue::Bool(true).to_string(), "Yes");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn serializes_as_plain_json_scalars() {
        let values = vec![
            CellValue::Empty,
            CellValue::Bool(true),
            CellValue::Number(3.0),
            CellValue::text("For Sale"),
        ];
        let json = serde_json::to_string(&values).expect("serializes");
        assert_eq!(json, r#"[null,true,3.0,"For Sale"]"#);
    }
}
