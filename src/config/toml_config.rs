use crate::adapters::openai::{
    OpenAiGenerator, DEFAULT_CHAT_ENDPOINT, DEFAULT_GENERATOR_TIMEOUT_SECS, DEFAULT_MODEL,
};
use crate::adapters::traderjoes::{
    TraderJoesSearch, DEFAULT_GRAPHQL_ENDPOINT, DEFAULT_RETAILER_TIMEOUT_SECS,
};
use crate::core::orchestrator::PlannerSettings;
use crate::utils::error::{PlannerError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub retailer: RetailerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub term_temperature: Option<f32>,
    pub selection_temperature: Option<f32>,
    pub plan_temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetailerConfig {
    pub endpoint: Option<String>,
    pub store_code: Option<String>,
    pub page_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub concurrent_requests: Option<usize>,
    pub monitoring: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PlannerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PlannerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PlannerError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn generator_endpoint(&self) -> &str {
        self.generator.endpoint.as_deref().unwrap_or(DEFAULT_CHAT_ENDPOINT)
    }

    pub fn model(&self) -> &str {
        self.generator.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// 設定檔中的金鑰優先，其次為 OPENAI_API_KEY 環境變數
    pub fn api_key(&self) -> Result<String> {
        let configured = self
            .generator
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty() && !key.starts_with("${"));

        match configured {
            Some(key) => Ok(key.to_string()),
            None => std::env::var(API_KEY_ENV).map_err(|_| PlannerError::MissingConfigError {
                field: format!("generator.api_key (or {})", API_KEY_ENV),
            }),
        }
    }

    pub fn retailer_endpoint(&self) -> &str {
        self.retailer.endpoint.as_deref().unwrap_or(DEFAULT_GRAPHQL_ENDPOINT)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.pipeline.monitoring.unwrap_or(false)
    }

    pub fn settings(&self) -> PlannerSettings {
        let defaults = PlannerSettings::default();
        PlannerSettings {
            term_temperature: self
                .generator
                .term_temperature
                .unwrap_or(defaults.term_temperature),
            selection_temperature: self
                .generator
                .selection_temperature
                .unwrap_or(defaults.selection_temperature),
            plan_temperature: self
                .generator
                .plan_temperature
                .unwrap_or(defaults.plan_temperature),
            store_code: self
                .retailer
                .store_code
                .clone()
                .unwrap_or(defaults.store_code),
            page_size: self.retailer.page_size.unwrap_or(defaults.page_size),
            concurrent_requests: self
                .pipeline
                .concurrent_requests
                .unwrap_or(defaults.concurrent_requests),
        }
    }

    pub fn build_generator(&self) -> Result<OpenAiGenerator> {
        let timeout = self
            .generator
            .timeout_seconds
            .unwrap_or(DEFAULT_GENERATOR_TIMEOUT_SECS);
        Ok(
            OpenAiGenerator::new(self.generator_endpoint(), self.api_key()?, self.model())
                .with_timeout(Duration::from_secs(timeout)),
        )
    }

    pub fn build_search(&self) -> TraderJoesSearch {
        let timeout = self
            .retailer
            .timeout_seconds
            .unwrap_or(DEFAULT_RETAILER_TIMEOUT_SECS);
        TraderJoesSearch::new(self.retailer_endpoint()).with_timeout(Duration::from_secs(timeout))
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_url("generator.endpoint", self.generator_endpoint())?;
        validate_url("retailer.endpoint", self.retailer_endpoint())?;
        validate_non_empty_string("generator.model", self.model())?;

        let settings = self.settings();
        validate_range("generator.term_temperature", settings.term_temperature, 0.0, 2.0)?;
        validate_range(
            "generator.selection_temperature",
            settings.selection_temperature,
            0.0,
            2.0,
        )?;
        validate_range("generator.plan_temperature", settings.plan_temperature, 0.0, 2.0)?;
        validate_non_empty_string("retailer.store_code", &settings.store_code)?;
        validate_positive_number("retailer.page_size", settings.page_size as usize, 1)?;
        validate_positive_number(
            "pipeline.concurrent_requests",
            settings.concurrent_requests,
            1,
        )?;

        if let Some(timeout) = self.generator.timeout_seconds {
            validate_positive_number("generator.timeout_seconds", timeout as usize, 1)?;
        }
        if let Some(timeout) = self.retailer.timeout_seconds {
            validate_positive_number("retailer.timeout_seconds", timeout as usize, 1)?;
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
