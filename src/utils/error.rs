use crate::domain::model::PipelineStage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Validation error on '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("Could not parse generated {expected}: {reason}")]
    GenerationParseError {
        expected: String,
        reason: String,
        raw: String,
    },

    #[error("{service} request failed: {message}")]
    ExternalServiceError { service: String, message: String },

    #[error("Pipeline failed during {stage}: {source}")]
    StageFailed {
        stage: PipelineStage,
        #[source]
        source: Box<PlannerError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Generation,
    ExternalService,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PlannerError {
    /// 將 reqwest 錯誤轉為外部服務錯誤，逾時會特別標示
    pub fn external(service: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        PlannerError::ExternalServiceError {
            service: service.to_string(),
            message,
        }
    }

    pub fn generation_parse(expected: &str, reason: impl Into<String>, raw: &str) -> Self {
        PlannerError::GenerationParseError {
            expected: expected.to_string(),
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    /// Tags the error with the pipeline stage it came from. Already-tagged errors keep their stage.
    pub fn at_stage(self, stage: PipelineStage) -> Self {
        match self {
            tagged @ PlannerError::StageFailed { .. } => tagged,
            other => PlannerError::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            PlannerError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// 去除階段包裝後的根本錯誤
    pub fn root(&self) -> &PlannerError {
        match self {
            PlannerError::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self.root() {
            PlannerError::GenerationParseError { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.root() {
            PlannerError::ValidationError { .. } => ErrorCategory::Input,
            PlannerError::GenerationParseError { .. } => ErrorCategory::Generation,
            PlannerError::ExternalServiceError { .. } => ErrorCategory::ExternalService,
            PlannerError::ConfigError { .. }
            | PlannerError::ConfigValidationError { .. }
            | PlannerError::InvalidConfigValueError { .. }
            | PlannerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            _ => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Generation | ErrorCategory::ExternalService => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Provide a non-empty preference string and a JSON array of products",
            ErrorCategory::Generation => {
                "The generative service returned an unexpected shape; run the request again"
            }
            ErrorCategory::ExternalService => {
                "Check network access, API keys and the configured endpoints, then retry"
            }
            ErrorCategory::Configuration => "Fix the configuration file or command line flags",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        let detail = match self.root() {
            PlannerError::ValidationError { message, .. } => message.clone(),
            PlannerError::GenerationParseError {
                expected, reason, ..
            } => format!("the generated {} could not be understood ({})", expected, reason),
            PlannerError::ExternalServiceError { service, message } => {
                format!("{} is unavailable ({})", service, message)
            }
            other => other.to_string(),
        };

        match self.stage() {
            Some(stage) => format!("Meal planning stopped at {}: {}", stage, detail),
            None => detail,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
