use anyhow::Context;
use clap::Parser;
use incident_formatter::core::field_mapper::FieldSource;
use incident_formatter::core::Pipeline;
use incident_formatter::utils::{logger, validation::Validate};
use incident_formatter::{FormatEngine, FormatterPipeline, LocalStorage, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-formatter")]
#[command(about = "Incident formatter driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "formatter.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Override the input from the config file
    #[arg(long)]
    input: Option<String>,

    /// Dry run - read the input and show the mapping plan without writing output
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_logger(args.verbose, args.log_json);

    tracing::info!("🚀 Starting TOML-based incident formatter");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    // 應用命令列覆蓋設定
    if let Some(input) = args.input.clone() {
        tracing::info!("🔧 Input overridden to: {}", input);
        config.source.input = input;
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    let aliases = config.alias_table()?;
    let storage = LocalStorage::default();
    let pipeline = FormatterPipeline::new(storage, config).with_aliases(aliases);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No output will be written");
        perform_dry_run(&pipeline).await?;
        return Ok(());
    }

    let engine = FormatEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Formatting completed successfully!");
            println!("✅ Formatting completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Formatting failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Job: {}", config.job.name);
    if let Some(description) = &config.job.description {
        println!("  Description: {}", description);
    }
    println!("  Source: {}", config.source.input);
    println!("  Tool: {}", config.format.tool);
    println!(
        "  CAD System: {}",
        config
            .format
            .cad_system
            .map_or_else(|| "auto-detect".to_string(), |s| s.to_string())
    );
    println!("  Output: {}", config.load.output_path);
    println!("  Formats: {}", config.load.output_formats.join(", "));

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(
    pipeline: &FormatterPipeline<LocalStorage, TomlConfig>,
) -> anyhow::Result<()> {
    let records = pipeline.extract().await?;
    let formatter = pipeline.formatter();

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📡 Input: {} records", records.len());

    let Some(sample) = records.first() else {
        println!("  ⚠️ Input is empty, nothing to map");
        return Ok(());
    };

    let mut columns: Vec<&str> = sample.columns().collect();
    columns.sort_unstable();
    println!("  Columns: {}", columns.join(", "));
    println!("  Detected CAD system: {}", formatter.detect_system(&records));

    let config = pipeline.config();
    println!();
    println!("🔄 Mapping plan for '{}':", config.format.tool);
    for (target, source) in formatter.mapping_plan(sample, config.format.tool, &config.format.field_mapping) {
        match source {
            Some(FieldSource::UserMapping(column)) => println!("  {:<16} <- {} (mapping)", target, column),
            Some(FieldSource::Alias(column)) => println!("  {:<16} <- {}", target, column),
            Some(FieldSource::ReportedDateTime(column)) => {
                println!("  {:<16} <- {} (split)", target, column)
            }
            None => println!("  {:<16} ✗ not found", target),
        }
    }

    let outcome = formatter.format(&records, config.format.tool, &config.format.field_mapping);
    println!();
    println!(
        "📊 {} of {} records have every required field",
        outcome.records.len() - outcome.incomplete.len(),
        outcome.records.len()
    );

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
