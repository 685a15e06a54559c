use anyhow::Context;
use clap::Parser;
use grocery_planner::config::{Command, OutputFormat};
use grocery_planner::core::retriever::ProductRetriever;
use grocery_planner::domain::model::{candidates_from_json, SelectionOutcome};
use grocery_planner::utils::error::ErrorSeverity;
use grocery_planner::utils::{export, logger, validation::Validate};
use grocery_planner::{
    CliConfig, MealPlanner, OpenAiGenerator, PlanOutcome, PlannerError, TomlConfig,
    TraderJoesSearch,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting grocery-planner");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證命令列與配置檔
    let config = match cli
        .validate()
        .and_then(|_| cli.load_config())
        .and_then(|config| config.validate().map(|_| config))
    {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    let rendered = match execute(&cli.command, &config).await {
        Ok(rendered) => rendered,
        Err(e) => exit_with(&e),
    };

    match cli.output_path() {
        Some(path) => {
            std::fs::write(path, rendered.as_bytes())
                .with_context(|| format!("failed to write output to {}", path))?;
            tracing::info!("📁 Output saved to: {}", path);
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

async fn execute(command: &Command, config: &TomlConfig) -> grocery_planner::Result<String> {
    match command {
        // search 指令不需要生成服務的金鑰
        Command::Search { terms } => {
            let settings = config.settings();
            let retriever = ProductRetriever::new(config.build_search())
                .with_store_code(settings.store_code)
                .with_page_size(settings.page_size)
                .with_concurrency(settings.concurrent_requests);
            let candidates = retriever.retrieve_all(terms).await?;
            Ok(serde_json::to_string_pretty(&candidates)?)
        }
        Command::Terms { preferences } => {
            let terms = build_planner(config)?.derive_terms(preferences).await?;
            Ok(serde_json::to_string_pretty(&terms)?)
        }
        Command::Filter {
            preferences,
            products,
            format,
            ..
        } => {
            let raw = std::fs::read_to_string(products)?;
            let candidates = candidates_from_json(&raw)?;
            let outcome = build_planner(config)?
                .filter(preferences, &candidates)
                .await?;
            render_selection(&outcome, *format)
        }
        Command::Draft { preferences, .. } => {
            let plan = build_planner(config)?.draft_plan(preferences).await?;
            Ok(plan.text().trim().to_string())
        }
        Command::Plan {
            preferences,
            format,
            ..
        } => {
            let outcome = build_planner(config)?.plan(preferences).await?;
            render_plan(&outcome, *format)
        }
    }
}

fn build_planner(
    config: &TomlConfig,
) -> grocery_planner::Result<MealPlanner<OpenAiGenerator, TraderJoesSearch>> {
    Ok(MealPlanner::new_with_monitoring(
        config.build_generator()?,
        config.build_search(),
        config.settings(),
        config.monitoring_enabled(),
    ))
}

fn render_selection(outcome: &SelectionOutcome, format: OutputFormat) -> grocery_planner::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => export::shopping_list_csv(&outcome.entries),
        OutputFormat::Text => Ok(shopping_list_text(outcome)),
    }
}

fn render_plan(outcome: &PlanOutcome, format: OutputFormat) -> grocery_planner::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => export::shopping_list_csv(&outcome.selection.entries),
        OutputFormat::Text => Ok(format!(
            "{}\n\nShopping list:\n{}",
            outcome.plan.text().trim(),
            shopping_list_text(&outcome.selection)
        )),
    }
}

fn shopping_list_text(outcome: &SelectionOutcome) -> String {
    let mut lines: Vec<String> = outcome
        .entries
        .iter()
        .map(|entry| {
            format!(
                "  {} x {} ({}{}) ${:.2}",
                entry.quantity,
                entry.name(),
                entry.product.size_label(),
                entry
                    .product
                    .unit_description
                    .as_deref()
                    .map(|unit| format!(" {}", unit))
                    .unwrap_or_default(),
                entry.line_total()
            )
        })
        .collect();
    lines.push(format!("Estimated total: ${:.2}", outcome.estimated_total()));
    if !outcome.dropped.is_empty() {
        lines.push(format!("Not found at the store: {}", outcome.dropped.join(", ")));
    }
    lines.join("\n")
}

fn exit_with(e: &PlannerError) -> ! {
    tracing::error!(
        "❌ Meal planning failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    if let Some(raw) = e.raw_response() {
        tracing::debug!("Raw generated response: {}", raw);
    }
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
