use crate::core::parse::parse_search_terms;
use crate::domain::model::{PreferenceQuery, SearchTerm};
use crate::domain::ports::TextGenerator;
use crate::utils::error::Result;

pub const DEFAULT_TERM_TEMPERATURE: f32 = 0.7;

/// Turns a preference string into grocery search terms.
pub struct TermDeriver<G: TextGenerator> {
    generator: G,
    temperature: f32,
}

impl<G: TextGenerator> TermDeriver<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            temperature: DEFAULT_TERM_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn prompt(preferences: &PreferenceQuery) -> String {
        format!(
            r#"
You are helping a user plan a grocery trip based on their dietary needs.

Preferences: "{}"

Return a JSON array of ingredients or grocery items they should search for.
ONLY return the array. Example: ["tempeh", "quinoa", "avocados", "tofu", "spinach"]
"#,
            preferences
        )
    }

    pub async fn derive_terms(&self, preferences: &PreferenceQuery) -> Result<Vec<SearchTerm>> {
        let prompt = Self::prompt(preferences);

        tracing::debug!("Requesting search terms for preferences: {}", preferences);
        let raw = self.generator.generate(&prompt, self.temperature).await?;
        tracing::debug!("🧠 Raw term response: {}", raw);

        let terms = parse_search_terms(&raw)?;
        tracing::info!("🔎 Derived {} search terms: {:?}", terms.len(), terms);

        if terms.is_empty() {
            tracing::warn!("Generative service returned no search terms");
        }

        Ok(terms)
    }
}
