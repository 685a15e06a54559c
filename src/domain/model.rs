use crate::utils::error::{PlannerError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub type SearchTerm = String;

/// 使用者輸入的飲食偏好，建構時即檢查非空
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PreferenceQuery(String);

impl PreferenceQuery {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(PlannerError::ValidationError {
                field: "preferences".to_string(),
                message: "preferences cannot be empty".to_string(),
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreferenceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A retailer product tagged with the search term that surfaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retail_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_description: Option<String>,
    #[serde(default)]
    pub matched_term: SearchTerm,
}

impl ProductRecord {
    /// 解析零售價格；缺少或無法解析時回傳 None
    pub fn unit_price(&self) -> Option<f64> {
        let raw = self.retail_price.as_deref()?.trim();
        let price = raw.strip_prefix('$').unwrap_or(raw).trim().parse::<f64>().ok()?;
        price.is_finite().then_some(price)
    }

    pub fn size_label(&self) -> &str {
        self.package_size.as_deref().unwrap_or("N/A")
    }

    /// Builds a selection entry by value; the record itself is never touched.
    pub fn with_quantity(&self, quantity: u32) -> SelectionEntry {
        SelectionEntry {
            product: self.clone(),
            quantity,
        }
    }
}

/// 讀取呼叫端提供的候選清單：JSON 陣列，或先前完整流程輸出中的 `candidates` 欄位
pub fn candidates_from_json(raw: &str) -> Result<Vec<ProductRecord>> {
    let invalid = |message: String| PlannerError::ValidationError {
        field: "products".to_string(),
        message,
    };

    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| invalid(format!("not valid JSON: {}", e)))?;

    let not_array = || invalid("expected a JSON array of products".to_string());
    let items = match value {
        serde_json::Value::Array(items) => serde_json::Value::Array(items),
        serde_json::Value::Object(mut outcome) => match outcome.remove("candidates") {
            Some(candidates @ serde_json::Value::Array(_)) => candidates,
            _ => return Err(not_array()),
        },
        _ => return Err(not_array()),
    };

    serde_json::from_value(items).map_err(|e| invalid(format!("malformed product entry: {}", e)))
}

/// Untrusted `{name, quantity}` pair after shape validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionRequest {
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionEntry {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub quantity: u32,
}

impl SelectionEntry {
    pub fn name(&self) -> &str {
        &self.product.name
    }

    /// 價格無法解析時計為 0
    pub fn line_total(&self) -> f64 {
        self.product.unit_price().unwrap_or(0.0) * f64::from(self.quantity)
    }
}

pub fn estimated_total(entries: &[SelectionEntry]) -> f64 {
    entries.iter().map(SelectionEntry::line_total).sum()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub entries: Vec<SelectionEntry>,
    /// Requested names that matched no candidate.
    pub dropped: Vec<String>,
}

impl SelectionOutcome {
    pub fn estimated_total(&self) -> f64 {
        estimated_total(&self.entries)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySection {
    pub day: u32,
    pub body: String,
}

/// Free-text meal plan. Day sections are a convention of the text, not a parsed structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealPlan(String);

fn day_header() -> &'static Regex {
    static DAY_HEADER: OnceLock<Regex> = OnceLock::new();
    DAY_HEADER.get_or_init(|| {
        Regex::new(r"(?mi)^[\s#*]*day\s+(\d+)\s*\**\s*:\**").expect("day header pattern is valid")
    })
}

impl MealPlan {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// 依照 "Day N:" 標題切分段落，標題之前的文字會被忽略
    pub fn days(&self) -> Vec<DaySection> {
        let headers: Vec<_> = day_header().captures_iter(&self.0).collect();
        let mut sections = Vec::with_capacity(headers.len());

        for (index, caps) in headers.iter().enumerate() {
            let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let end = headers
                .get(index + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(self.0.len());
            let day = caps[1].parse().unwrap_or(0);
            sections.push(DaySection {
                day,
                body: self.0[whole..end].trim().to_string(),
            });
        }

        sections
    }
}

impl fmt::Display for MealPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Terms,
    Retrieval,
    Selection,
    Plan,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Terms => "term derivation",
            PipelineStage::Retrieval => "product retrieval",
            PipelineStage::Selection => "product selection",
            PipelineStage::Plan => "plan synthesis",
        };
        f.write_str(name)
    }
}

/// 完整流程的所有中間產物
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutcome {
    pub preferences: PreferenceQuery,
    pub terms: Vec<SearchTerm>,
    pub candidates: Vec<ProductRecord>,
    pub selection: SelectionOutcome,
    pub plan: MealPlan,
    pub estimated_total: f64,
    pub generated_at: DateTime<Utc>,
}
