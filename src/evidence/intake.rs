//! Evidence intake: turning extractor output into evidence items.
//!
//! Two shapes are accepted:
//!
//! - The extraction service's response, a JSON object keyed by field label:
//!   `{"Settlement Date": {"value": "..", "verbatim_quote": "..", "page_number": 3}}`.
//!   Models sometimes wrap it in a Markdown code fence or in a one-element
//!   array; both are unwrapped.
//! - A plain evidence list: `[{"label": "..", "quote": "..", "claimed_page": 3}]`.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::EvidenceItem;

/// Errors raised while reading evidence input
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected evidence format: {0}")]
    Format(String),

    #[error("Duplicate evidence label: {0}")]
    DuplicateLabel(String),
}

/// Strip a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````)
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse evidence from either accepted shape
pub fn parse_evidence(raw: &str) -> Result<Vec<EvidenceItem>, IntakeError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;

    match value {
        Value::Array(items) if is_evidence_list(&items) => evidence_list(items),
        Value::Array(items) => extraction_response(merge_objects(items)?),
        Value::Object(map) => extraction_response(map),
        other => Err(IntakeError::Format(format!(
            "expected an object or array, got {}",
            json_type(&other)
        ))),
    }
}

/// Parse the extraction service's response only
pub fn parse_extraction_response(raw: &str) -> Result<Vec<EvidenceItem>, IntakeError> {
    match serde_json::from_str(strip_code_fence(raw))? {
        Value::Object(map) => extraction_response(map),
        Value::Array(items) => extraction_response(merge_objects(items)?),
        other => Err(IntakeError::Format(format!(
            "expected an object, got {}",
            json_type(&other)
        ))),
    }
}

fn is_evidence_list(items: &[Value]) -> bool {
    !items.is_empty()
        && items
            .iter()
            .all(|item| item.get("label").map_or(false, Value::is_string))
}

fn evidence_list(items: Vec<Value>) -> Result<Vec<EvidenceItem>, IntakeError> {
    let mut seen = HashSet::new();
    let mut evidence = Vec::with_capacity(items.len());

    for item in items {
        let item: EvidenceItem = serde_json::from_value(item)?;
        if !seen.insert(item.label.clone()) {
            return Err(IntakeError::DuplicateLabel(item.label));
        }
        evidence.push(item);
    }

    Ok(evidence)
}

/// Merge an array of objects into one, later keys overwriting earlier ones
fn merge_objects(items: Vec<Value>) -> Result<Map<String, Value>, IntakeError> {
    match items.first() {
        Some(Value::Object(_)) => {}
        Some(other) => {
            return Err(IntakeError::Format(format!(
                "array does not contain objects (found {})",
                json_type(other)
            )))
        }
        None => return Err(IntakeError::Format("empty array".to_string())),
    }

    let mut merged = Map::new();
    for item in items {
        if let Value::Object(map) = item {
            merged.extend(map);
        }
    }
    Ok(merged)
}

fn extraction_response(map: Map<String, Value>) -> Result<Vec<EvidenceItem>, IntakeError> {
    let mut evidence = Vec::with_capacity(map.len());

    for (label, field) in map {
        let Value::Object(field) = field else {
            debug!(%label, "Skipping non-object field in extraction response");
            continue;
        };

        let quote = field
            .get("verbatim_quote")
            .and_then(Value::as_str)
            .map(str::to_string);

        let claimed_page = field.get("page_number").filter(|v| !v.is_null()).cloned();

        let value = match field.get("value") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        evidence.push(EvidenceItem {
            label,
            quote,
            claimed_page,
            value,
        });
    }

    Ok(evidence)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
