pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{OpenAiGenerator, TraderJoesSearch};
pub use core::orchestrator::{MealPlanner, PlannerSettings};
pub use domain::model::{
    MealPlan, PipelineStage, PlanOutcome, ProductRecord, SelectionEntry, SelectionOutcome,
};
pub use domain::ports::{ProductSearch, TextGenerator};
pub use utils::error::{PlannerError, Result};
