// Adapters layer: concrete HTTP clients for the generative and retailer services.

pub mod openai;
pub mod traderjoes;

pub use openai::OpenAiGenerator;
pub use traderjoes::TraderJoesSearch;
