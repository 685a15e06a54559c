//! Parse-then-validate boundary for generated text.
//!
//! Generated responses are decoded into a provisional `serde_json::Value`,
//! checked for the expected shape, and only then promoted to domain values.
//! Any mismatch becomes `GenerationParseError` carrying the raw response.

use crate::domain::model::{SearchTerm, SelectionRequest};
use crate::utils::error::{PlannerError, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const SEARCH_TERMS: &str = "search terms";
const SELECTION: &str = "product selection";

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"^```[A-Za-z]*\s*\n?([\s\S]*?)\n?\s*```$").expect("code fence pattern is valid")
    })
}

/// 嘗試解碼為 JSON，允許整段被 markdown code block 包住
fn decode_json(raw: &str, expected: &str) -> Result<Value> {
    let trimmed = raw.trim();
    let body = code_fence()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);

    serde_json::from_str(body).map_err(|e| {
        tracing::debug!("Generated {} is not valid JSON: {}", expected, e);
        PlannerError::generation_parse(expected, format!("invalid JSON: {}", e), raw)
    })
}

fn expect_array(value: Value, raw: &str, expected: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(PlannerError::generation_parse(
            expected,
            format!("expected a JSON array, got {}", json_kind(&other)),
            raw,
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses a JSON array of strings. Order and duplicates are kept as generated.
pub fn parse_search_terms(raw: &str) -> Result<Vec<SearchTerm>> {
    let items = expect_array(decode_json(raw, SEARCH_TERMS)?, raw, SEARCH_TERMS)?;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(term) => Ok(term),
            other => Err(PlannerError::generation_parse(
                SEARCH_TERMS,
                format!("element {} is {}, expected a string", index, json_kind(&other)),
                raw,
            )),
        })
        .collect()
}

/// Parses a JSON array of `{name, quantity}` objects.
pub fn parse_selection_requests(raw: &str) -> Result<Vec<SelectionRequest>> {
    let items = expect_array(decode_json(raw, SELECTION)?, raw, SELECTION)?;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| selection_request(index, &item, raw))
        .collect()
}

fn selection_request(index: usize, item: &Value, raw: &str) -> Result<SelectionRequest> {
    let fail = |reason: String| PlannerError::generation_parse(SELECTION, reason, raw);

    let object = item
        .as_object()
        .ok_or_else(|| fail(format!("element {} is {}, expected an object", index, json_kind(item))))?;

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| fail(format!("element {} has no string 'name'", index)))?;

    let quantity = object
        .get("quantity")
        .and_then(positive_quantity)
        .ok_or_else(|| fail(format!("element {} has no positive integer 'quantity'", index)))?;

    Ok(SelectionRequest {
        name: name.to_string(),
        quantity,
    })
}

// 接受 2 或 2.0，拒絕 0、負數與小數
fn positive_quantity(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok().filter(|n| *n > 0);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= 1.0 && f <= f64::from(u32::MAX) {
        Some(f as u32)
    } else {
        None
    }
}
