//! Evidence items: one AI-claimed field with its purported quote and page.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One extracted field to be checked against the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Field label, unique within one evidence list
    pub label: String,

    /// Claimed verbatim quote
    #[serde(default)]
    pub quote: Option<String>,

    /// Page the extractor claims, exactly as received (number, string, null)
    #[serde(default, alias = "page_number")]
    pub claimed_page: Option<Value>,

    /// Extracted value, carried for display only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl EvidenceItem {
    /// Create an evidence item with an integer claimed page
    pub fn new(label: impl Into<String>, quote: Option<&str>, claimed_page: Option<i64>) -> Self {
        Self {
            label: label.into(),
            quote: quote.map(str::to_string),
            claimed_page: claimed_page.map(Value::from),
            value: None,
        }
    }

    /// Attach the extracted value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Claimed page coerced to a 1-based page number, if usable
    pub fn claimed_page_number(&self) -> Option<u32> {
        self.claimed_page.as_ref().and_then(coerce_page)
    }
}

/// Coerce a loosely typed page value to a 1-based page number.
///
/// Integers pass through, floats truncate toward zero, strings are parsed as
/// integers after trimming. Zero, negatives and every other JSON type yield
/// `None`. Booleans in particular are not read as numbers, so `true` is an
/// absent page and not page 1.
pub fn coerce_page(value: &Value) -> Option<u32> {
    let page = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if let Some(u) = n.as_u64() {
                i64::try_from(u).ok()?
            } else {
                let f = n.as_f64()?;
                if !f.is_finite() {
                    return None;
                }
                f.trunc() as i64
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    if page >= 1 {
        u32::try_from(page).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_integers() {
        assert_eq!(coerce_page(&json!(4)), Some(4));
        assert_eq!(coerce_page(&json!(0)), None);
        assert_eq!(coerce_page(&json!(-2)), None);
    }

    #[test]
    fn test_coerce_floats_truncate() {
        assert_eq!(coerce_page(&json!(3.0)), Some(3));
        assert_eq!(coerce_page(&json!(3.9)), Some(3));
        assert_eq!(coerce_page(&json!(0.5)), None);
    }

    #[test]
    fn test_coerce_strings() {
        assert_eq!(coerce_page(&json!("7")), Some(7));
        assert_eq!(coerce_page(&json!("  12 ")), Some(12));
        assert_eq!(coerce_page(&json!("page 3")), None);
        assert_eq!(coerce_page(&json!("3.5")), None);
        assert_eq!(coerce_page(&json!("")), None);
    }

    #[test]
    fn test_coerce_other_types() {
        assert_eq!(coerce_page(&json!(null)), None);
        assert_eq!(coerce_page(&json!(true)), None);
        assert_eq!(coerce_page(&json!([1])), None);
        assert_eq!(coerce_page(&json!({"page": 1})), None);
    }

    #[test]
    fn test_deserialize_accepts_page_number_alias() {
        let item: EvidenceItem = serde_json::from_value(json!({
            "label": "Contract Date",
            "quote": "dated 1 March 2025",
            "page_number": "2"
        }))
        .unwrap();
        assert_eq!(item.claimed_page_number(), Some(2));
        assert!(item.value.is_none());
    }
}
