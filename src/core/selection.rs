use crate::core::parse::parse_selection_requests;
use crate::domain::model::{PreferenceQuery, ProductRecord, SelectionOutcome, SelectionRequest};
use crate::domain::ports::TextGenerator;
use crate::utils::error::Result;

pub const DEFAULT_SELECTION_TEMPERATURE: f32 = 0.5;

/// Asks the generative service to pick products with quantities, then maps the
/// picked names back onto the candidate set.
pub struct SelectionFilter<G: TextGenerator> {
    generator: G,
    temperature: f32,
}

impl<G: TextGenerator> SelectionFilter<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            temperature: DEFAULT_SELECTION_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn prompt(preferences: &PreferenceQuery, candidates: &[ProductRecord]) -> String {
        format!(
            r#"
User preferences: "{}"

Here is a list of grocery products:

{}

Return a JSON array of product objects that match the preferences.
Each object must include:
- name (must exactly match a name in the list)
- quantity (number of times it should be purchased for the week's meals)

Example:
[
  {{ "name": "Tofu", "quantity": 2 }},
  {{ "name": "Coconut Yogurt", "quantity": 1 }}
]

Check the prices and the quantity of each to plan for the week. Make sure it is not too expensive, but the person has enough food.

ONLY return the array.
"#,
            preferences,
            candidate_listing(candidates)
        )
    }

    pub async fn filter(
        &self,
        preferences: &PreferenceQuery,
        candidates: &[ProductRecord],
    ) -> Result<SelectionOutcome> {
        let prompt = Self::prompt(preferences, candidates);

        tracing::debug!("Asking generator to select from {} candidates", candidates.len());
        let raw = self.generator.generate(&prompt, self.temperature).await?;
        tracing::debug!("🧠 Raw selection response: {}", raw);

        let requests = parse_selection_requests(&raw)?;
        let outcome = reconcile(&requests, candidates);

        tracing::info!(
            "✅ Matched {} of {} selected products",
            outcome.entries.len(),
            requests.len()
        );
        if !outcome.dropped.is_empty() {
            tracing::warn!("Dropped unmatched selections: {:?}", outcome.dropped);
        }

        Ok(outcome)
    }
}

/// `1. name - size (description)` lines, numbered from 1.
pub fn candidate_listing(candidates: &[ProductRecord]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(index, product)| {
            let description = product
                .description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .map(|d| format!(" ({})", d))
                .unwrap_or_default();
            format!("{}. {} - {}{}", index + 1, product.name, product.size_label(), description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 以不分大小寫的子字串比對，候選清單中第一個符合者勝出；找不到的名稱記錄於 dropped
pub fn reconcile(requests: &[SelectionRequest], candidates: &[ProductRecord]) -> SelectionOutcome {
    let lowered: Vec<String> = candidates.iter().map(|p| p.name.to_lowercase()).collect();
    let mut outcome = SelectionOutcome::default();

    for request in requests {
        let needle = request.name.trim().to_lowercase();
        let matched = if needle.is_empty() {
            None
        } else {
            lowered.iter().position(|name| name.contains(&needle))
        };

        match matched {
            Some(index) => {
                let entry = candidates[index].with_quantity(request.quantity);
                outcome.entries.push(entry);
            }
            None => outcome.dropped.push(request.name.clone()),
        }
    }

    outcome
}
