pub mod orchestrator;
pub mod parse;
pub mod plan;
pub mod retriever;
pub mod selection;
pub mod terms;

pub use crate::domain::model::{
    MealPlan, PlanOutcome, PreferenceQuery, ProductRecord, SearchTerm, SelectionEntry,
    SelectionOutcome, SelectionRequest,
};
pub use crate::domain::ports::{ProductSearch, RawProduct, SearchQuery, TextGenerator};
pub use crate::utils::error::Result;
