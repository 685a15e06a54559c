use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use clap::{Parser, Subcommand, ValueEnum};

pub const DEFAULT_CONFIG_FILE: &str = "planner.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "grocery-planner")]
#[command(about = "Weekly grocery list and meal plan from free-text dietary preferences")]
pub struct CliConfig {
    /// Path to TOML configuration file (defaults to ./planner.toml when present)
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Log elapsed time and memory after each stage")]
    pub monitor: bool,

    /// Override the retailer store code from config
    #[arg(long)]
    pub store_code: Option<String>,

    /// Override the generative model from config
    #[arg(long)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Derive grocery search terms from preferences
    Terms {
        #[arg(short, long)]
        preferences: String,
    },
    /// Search the retailer for one or more terms
    Search {
        #[arg(short, long = "term", required = true)]
        terms: Vec<String>,
    },
    /// Select products with quantities from an existing candidate file
    Filter {
        #[arg(short, long)]
        preferences: String,

        /// JSON array of products, or the JSON output of a previous `plan` run
        #[arg(long)]
        products: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(short, long)]
        output: Option<String>,
    },
    /// Draft a meal plan from preferences alone, without searching the retailer
    Draft {
        #[arg(short, long)]
        preferences: String,

        #[arg(short, long)]
        output: Option<String>,
    },
    /// Run the full pipeline: terms, products, selection and meal plan
    Plan {
        #[arg(short, long)]
        preferences: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Csv,
}

impl CliConfig {
    /// 載入 TOML 配置並套用命令列覆蓋設定
    pub fn load_config(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() => {
                TomlConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => TomlConfig::default(),
        };

        if let Some(store_code) = &self.store_code {
            config.retailer.store_code = Some(store_code.clone());
            tracing::info!("🔧 Store code overridden to: {}", store_code);
        }
        if let Some(model) = &self.model {
            config.generator.model = Some(model.clone());
            tracing::info!("🔧 Model overridden to: {}", model);
        }
        if self.monitor {
            config.pipeline.monitoring = Some(true);
        }

        Ok(config)
    }

    pub fn output_path(&self) -> Option<&str> {
        match &self.command {
            Command::Filter { output, .. }
            | Command::Draft { output, .. }
            | Command::Plan { output, .. } => output.as_deref(),
            _ => None,
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validate_path("config", path)?;
        }
        if let Some(store_code) = &self.store_code {
            validate_non_empty_string("store_code", store_code)?;
        }
        if let Some(model) = &self.model {
            validate_non_empty_string("model", model)?;
        }
        if let Command::Filter { products, .. } = &self.command {
            validate_path("products", products)?;
        }
        if let Some(output) = self.output_path() {
            validate_path("output", output)?;
        }
        Ok(())
    }
}
