use crate::domain::model::{MealPlan, PreferenceQuery, SelectionEntry};
use crate::domain::ports::TextGenerator;
use crate::utils::error::{PlannerError, Result};

pub const DEFAULT_PLAN_TEMPERATURE: f32 = 0.7;

pub struct PlanSynthesizer<G: TextGenerator> {
    generator: G,
    temperature: f32,
}

impl<G: TextGenerator> PlanSynthesizer<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            temperature: DEFAULT_PLAN_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn prompt(preferences: &PreferenceQuery, selection: &[SelectionEntry]) -> String {
        let product_lines = selection
            .iter()
            .map(|entry| format!("- {} ({})", entry.name(), entry.product.size_label()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"
You are a meal planning assistant.

User preferences: "{}"

Available products this week:
{}

Using ONLY these products, create a 7-day meal plan with breakfast, lunch, and dinner each day.
Start each day with a header line in the form "Day 1:", "Day 2:" and so on.
Each meal should name the product(s) used. Do not add products that are not listed.
Keep it simple and realistic. No recipes needed.
"#,
            preferences, product_lines
        )
    }

    /// Preference-only plan: no product list, every meal names its ingredients.
    pub fn draft_prompt(preferences: &PreferenceQuery) -> String {
        format!(
            r#"
Create a 7-day meal plan for someone with the following preferences and dietary restrictions:
"{}"

Each day should include:
- Breakfast, lunch, and dinner
- A list of ingredients needed for each meal
- Prefer Trader Joe's style ingredients when possible
- No recipes needed

Format:
Day 1:
- Breakfast: ...
  Ingredients: ...
...
"#,
            preferences
        )
    }

    /// 僅依偏好產生草稿計畫，不查詢任何商品
    pub async fn draft(&self, preferences: &PreferenceQuery) -> Result<MealPlan> {
        let prompt = Self::draft_prompt(preferences);
        let raw = self.generator.generate(&prompt, self.temperature).await?;

        if raw.trim().is_empty() {
            return Err(PlannerError::generation_parse("meal plan", "empty response", &raw));
        }

        let plan = MealPlan::new(raw);
        tracing::info!("📝 Draft meal plan generated with {} day sections", plan.days().len());
        Ok(plan)
    }

    /// 產生七天餐點計畫；內容只當作不透明文字處理
    pub async fn synthesize(
        &self,
        preferences: &PreferenceQuery,
        selection: &[SelectionEntry],
    ) -> Result<MealPlan> {
        if selection.is_empty() {
            tracing::warn!("Synthesizing a meal plan with no selected products");
        }

        let prompt = Self::prompt(preferences, selection);
        let raw = self.generator.generate(&prompt, self.temperature).await?;

        if raw.trim().is_empty() {
            return Err(PlannerError::generation_parse("meal plan", "empty response", &raw));
        }

        let plan = MealPlan::new(raw);
        tracing::info!("🍽️ Meal plan generated with {} day sections", plan.days().len());
        Ok(plan)
    }
}
