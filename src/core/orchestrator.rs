use crate::core::plan::{PlanSynthesizer, DEFAULT_PLAN_TEMPERATURE};
use crate::core::retriever::{
    ProductRetriever, DEFAULT_CONCURRENT_REQUESTS, DEFAULT_PAGE_SIZE, DEFAULT_STORE_CODE,
};
use crate::core::selection::{SelectionFilter, DEFAULT_SELECTION_TEMPERATURE};
use crate::core::terms::{TermDeriver, DEFAULT_TERM_TEMPERATURE};
use crate::domain::model::{
    MealPlan, PipelineStage, PlanOutcome, PreferenceQuery, ProductRecord, SearchTerm,
    SelectionEntry, SelectionOutcome,
};
use crate::domain::ports::{ProductSearch, TextGenerator};
use crate::utils::error::Result;
use crate::utils::monitor::StageMonitor;
use std::sync::Arc;

/// Tunables shared by the pipeline stages.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    pub term_temperature: f32,
    pub selection_temperature: f32,
    pub plan_temperature: f32,
    pub store_code: String,
    pub page_size: u32,
    pub concurrent_requests: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            term_temperature: DEFAULT_TERM_TEMPERATURE,
            selection_temperature: DEFAULT_SELECTION_TEMPERATURE,
            plan_temperature: DEFAULT_PLAN_TEMPERATURE,
            store_code: DEFAULT_STORE_CODE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
        }
    }
}

/// Sequences terms -> retrieval -> selection -> plan. Holds no per-request state.
pub struct MealPlanner<G: TextGenerator, S: ProductSearch> {
    terms: TermDeriver<Arc<G>>,
    retriever: ProductRetriever<S>,
    selection: SelectionFilter<Arc<G>>,
    synthesizer: PlanSynthesizer<Arc<G>>,
    monitor: StageMonitor,
}

impl<G: TextGenerator, S: ProductSearch> MealPlanner<G, S> {
    pub fn new(generator: G, search: S, settings: PlannerSettings) -> Self {
        Self::new_with_monitoring(generator, search, settings, false)
    }

    pub fn new_with_monitoring(
        generator: G,
        search: S,
        settings: PlannerSettings,
        monitor_enabled: bool,
    ) -> Self {
        let generator = Arc::new(generator);

        Self {
            terms: TermDeriver::new(Arc::clone(&generator))
                .with_temperature(settings.term_temperature),
            retriever: ProductRetriever::new(search)
                .with_store_code(settings.store_code)
                .with_page_size(settings.page_size)
                .with_concurrency(settings.concurrent_requests),
            selection: SelectionFilter::new(Arc::clone(&generator))
                .with_temperature(settings.selection_temperature),
            synthesizer: PlanSynthesizer::new(generator)
                .with_temperature(settings.plan_temperature),
            monitor: StageMonitor::new(monitor_enabled),
        }
    }

    /// 完整流程：任何階段失敗即中止，錯誤會標示失敗的階段
    pub async fn plan(&self, preferences: &str) -> Result<PlanOutcome> {
        let preferences = PreferenceQuery::new(preferences)?;
        tracing::info!("🚀 Starting meal planning for: {}", preferences);

        let terms = self
            .terms
            .derive_terms(&preferences)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Terms))?;
        self.monitor.log_stage("terms");

        let candidates = self
            .retriever
            .retrieve_all(&terms)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Retrieval))?;
        self.monitor.log_stage("retrieval");

        let selection = self
            .selection
            .filter(&preferences, &candidates)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Selection))?;
        self.monitor.log_stage("selection");

        let plan = self
            .synthesizer
            .synthesize(&preferences, &selection.entries)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Plan))?;
        self.monitor.log_stage("plan");

        let estimated_total = selection.estimated_total();
        tracing::info!(
            "✅ Meal planning completed: {} terms, {} candidates, {} selected, est. ${:.2}",
            terms.len(),
            candidates.len(),
            selection.entries.len(),
            estimated_total
        );
        self.monitor.log_final_stats();

        Ok(PlanOutcome {
            preferences,
            terms,
            candidates,
            selection,
            plan,
            estimated_total,
            generated_at: chrono::Utc::now(),
        })
    }

    /// Re-filters an existing candidate set without deriving terms or searching again.
    pub async fn filter(
        &self,
        preferences: &str,
        candidates: &[ProductRecord],
    ) -> Result<SelectionOutcome> {
        let preferences = PreferenceQuery::new(preferences)?;
        tracing::info!("🔁 Filtering {} supplied candidates", candidates.len());

        let outcome = self
            .selection
            .filter(&preferences, candidates)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Selection))?;
        self.monitor.log_stage("selection");
        Ok(outcome)
    }

    /// Meal plan from preferences alone; no terms, no retailer search.
    pub async fn draft_plan(&self, preferences: &str) -> Result<MealPlan> {
        let preferences = PreferenceQuery::new(preferences)?;
        tracing::info!("📝 Drafting meal plan for: {}", preferences);

        let plan = self
            .synthesizer
            .draft(&preferences)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Plan))?;
        self.monitor.log_stage("plan");
        Ok(plan)
    }

    pub async fn derive_terms(&self, preferences: &str) -> Result<Vec<SearchTerm>> {
        let preferences = PreferenceQuery::new(preferences)?;
        self.terms
            .derive_terms(&preferences)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Terms))
    }

    pub async fn retrieve_all(&self, terms: &[SearchTerm]) -> Result<Vec<ProductRecord>> {
        self.retriever
            .retrieve_all(terms)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Retrieval))
    }

    pub async fn synthesize(
        &self,
        preferences: &str,
        selection: &[SelectionEntry],
    ) -> Result<MealPlan> {
        let preferences = PreferenceQuery::new(preferences)?;
        self.synthesizer
            .synthesize(&preferences, selection)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{RawProduct, SearchQuery};
    use crate::utils::error::PlannerError;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::Mutex;

    /// Replays scripted responses in call order.
    struct ScriptedGenerator {
        responses: Mutex<VecDeque<String>>,
        calls: Mutex<usize>,
    }

    impl ScriptedGenerator {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            *self.calls.lock().await += 1;
            self.responses
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| PlannerError::ExternalServiceError {
                    service: "generator".to_string(),
                    message: "no scripted response left".to_string(),
                })
        }
    }

    struct StubSearch {
        results: HashMap<String, Vec<RawProduct>>,
        calls: Mutex<usize>,
    }

    impl StubSearch {
        fn new() -> Self {
            let mut results = HashMap::new();
            results.insert(
                "tofu".to_string(),
                vec![RawProduct {
                    name: "Organic Tofu".to_string(),
                    retail_price: Some("2.99".to_string()),
                    package_size: Some("14 oz".to_string()),
                    ..Default::default()
                }],
            );
            results.insert(
                "quinoa".to_string(),
                vec![RawProduct {
                    name: "Quinoa Blend".to_string(),
                    retail_price: Some("4.49".to_string()),
                    ..Default::default()
                }],
            );
            Self {
                results,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ProductSearch for StubSearch {
        async fn search(&self, query: &SearchQuery) -> Result<Vec<RawProduct>> {
            *self.calls.lock().await += 1;
            self.results
                .get(&query.search_text)
                .cloned()
                .ok_or_else(|| PlannerError::ExternalServiceError {
                    service: "retailer".to_string(),
                    message: format!("no results for {}", query.search_text),
                })
        }
    }

    const PLAN_TEXT: &str = "Day 1:\n- Breakfast: Organic Tofu scramble\nDay 2:\n- Dinner: Organic Tofu bowl";

    #[tokio::test]
    async fn test_plan_end_to_end_scenario() {
        let generator = ScriptedGenerator::new(&[
            r#"["tofu", "quinoa"]"#,
            r#"[{"name": "Tofu", "quantity": 2}]"#,
            PLAN_TEXT,
        ]);
        let planner = MealPlanner::new(generator, StubSearch::new(), PlannerSettings::default());

        let outcome = planner.plan("vegetarian, high protein").await.unwrap();

        assert_eq!(outcome.terms, vec!["tofu", "quinoa"]);
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[1].matched_term, "quinoa");

        let entries = &outcome.selection.entries;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "Organic Tofu");
        assert_eq!(entries[0].product.retail_price.as_deref(), Some("2.99"));
        assert_eq!(entries[0].product.package_size.as_deref(), Some("14 oz"));
        assert_eq!(entries[0].product.matched_term, "tofu");
        assert_eq!(entries[0].quantity, 2);
        assert!((outcome.estimated_total - 5.98).abs() < 1e-9);
        assert_eq!(outcome.plan.days().len(), 2);
    }

    #[tokio::test]
    async fn test_plan_rejects_empty_preferences_without_calls() {
        let generator = Arc::new(ScriptedGenerator::new(&[]));
        let search = Arc::new(StubSearch::new());
        let planner = MealPlanner::new(
            Arc::clone(&generator),
            Arc::clone(&search),
            PlannerSettings::default(),
        );

        let err = planner.plan("   ").await.unwrap_err();

        assert!(matches!(err, PlannerError::ValidationError { .. }));
        assert_eq!(err.stage(), None);
        assert_eq!(*generator.calls.lock().await, 0);
        assert_eq!(*search.calls.lock().await, 0);
    }

    #[tokio::test]
    async fn test_plan_term_parse_failure_stops_pipeline() {
        let generator = Arc::new(ScriptedGenerator::new(&["tofu and quinoa please"]));
        let search = Arc::new(StubSearch::new());
        let planner = MealPlanner::new(
            Arc::clone(&generator),
            Arc::clone(&search),
            PlannerSettings::default(),
        );

        let err = planner.plan("vegetarian").await.unwrap_err();

        assert_eq!(err.stage(), Some(PipelineStage::Terms));
        assert!(matches!(err.root(), PlannerError::GenerationParseError { .. }));
        assert_eq!(*generator.calls.lock().await, 1);
        assert_eq!(*search.calls.lock().await, 0);
    }

    #[tokio::test]
    async fn test_plan_retrieval_failure_identifies_stage() {
        let generator = Arc::new(ScriptedGenerator::new(&[r#"["tofu", "seitan"]"#]));
        let planner = MealPlanner::new(
            Arc::clone(&generator),
            StubSearch::new(),
            PlannerSettings::default(),
        );

        let err = planner.plan("vegetarian").await.unwrap_err();

        assert_eq!(err.stage(), Some(PipelineStage::Retrieval));
        assert!(matches!(err.root(), PlannerError::ExternalServiceError { .. }));
        assert_eq!(*generator.calls.lock().await, 1);
    }

    #[tokio::test]
    async fn test_plan_selection_failure_skips_synthesis() {
        let generator = Arc::new(ScriptedGenerator::new(&[
            r#"["tofu"]"#,
            r#"[{"name": "Tofu", "quantity": 2"#,
            PLAN_TEXT,
        ]));
        let planner = MealPlanner::new(
            Arc::clone(&generator),
            StubSearch::new(),
            PlannerSettings::default(),
        );

        let err = planner.plan("vegetarian").await.unwrap_err();

        assert_eq!(err.stage(), Some(PipelineStage::Selection));
        assert_eq!(*generator.calls.lock().await, 2);
    }

    #[tokio::test]
    async fn test_standalone_filter_runs_only_selection() {
        let generator = Arc::new(ScriptedGenerator::new(&[
            r#"[{"name": "quinoa", "quantity": 1}, {"name": "kale", "quantity": 3}]"#,
        ]));
        let search = Arc::new(StubSearch::new());
        let planner = MealPlanner::new(
            Arc::clone(&generator),
            Arc::clone(&search),
            PlannerSettings::default(),
        );
        let candidates = vec![ProductRecord {
            name: "Quinoa Blend".to_string(),
            description: None,
            image_url: None,
            retail_price: Some("4.49".to_string()),
            package_size: None,
            unit_description: None,
            matched_term: "quinoa".to_string(),
        }];

        let outcome = planner.filter("gluten free", &candidates).await.unwrap();

        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].product, candidates[0]);
        assert_eq!(outcome.dropped, vec!["kale"]);
        assert_eq!(*generator.calls.lock().await, 1);
        assert_eq!(*search.calls.lock().await, 0);
    }

    #[tokio::test]
    async fn test_standalone_filter_rejects_empty_preferences() {
        let generator = Arc::new(ScriptedGenerator::new(&[]));
        let planner = MealPlanner::new(
            Arc::clone(&generator),
            StubSearch::new(),
            PlannerSettings::default(),
        );

        let err = planner.filter("", &[]).await.unwrap_err();

        assert!(matches!(err, PlannerError::ValidationError { .. }));
        assert_eq!(*generator.calls.lock().await, 0);
    }

    #[tokio::test]
    async fn test_draft_plan_skips_retrieval_and_selection() {
        let generator = Arc::new(ScriptedGenerator::new(&[PLAN_TEXT]));
        let search = Arc::new(StubSearch::new());
        let planner = MealPlanner::new(
            Arc::clone(&generator),
            Arc::clone(&search),
            PlannerSettings::default(),
        );

        let plan = planner.draft_plan("vegetarian").await.unwrap();

        assert_eq!(plan.text(), PLAN_TEXT);
        assert_eq!(*generator.calls.lock().await, 1);
        assert_eq!(*search.calls.lock().await, 0);
    }

    #[tokio::test]
    async fn test_draft_plan_empty_response_identifies_stage() {
        let generator = Arc::new(ScriptedGenerator::new(&["   "]));
        let planner = MealPlanner::new(
            Arc::clone(&generator),
            StubSearch::new(),
            PlannerSettings::default(),
        );

        let err = planner.draft_plan("vegetarian").await.unwrap_err();

        assert_eq!(err.stage(), Some(PipelineStage::Plan));
        assert!(matches!(err.root(), PlannerError::GenerationParseError { .. }));
    }
}
