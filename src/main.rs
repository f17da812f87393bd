use age_histogram::core::report;
use age_histogram::utils::error::{ErrorSeverity, HistogramError};
use age_histogram::utils::logger;
use age_histogram::{today_local, CliConfig, FileSource, HistogramEngine, HistogramPipeline};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    let Some(input) = config.input.clone() else {
        print_banner();
        return Ok(());
    };

    let settings = match config.load_settings() {
        Ok(settings) => settings,
        Err(e) => fail(&e, "Configuration validation failed"),
    };

    let reference_date = settings.reference_date.unwrap_or_else(today_local);
    tracing::info!("📅 Reference date: {}", reference_date);

    let pipeline = HistogramPipeline::new(FileSource::new(input), settings.pipeline, reference_date);
    let engine = HistogramEngine::new_with_monitoring(pipeline, settings.monitor);

    let summary = match engine.run() {
        Ok(summary) => summary,
        Err(e) => fail(&e, "Age histogram run failed"),
    };

    // 開檔失敗只回報診斷訊息，仍以成功結束
    if let Some(err) = &summary.source_error {
        eprintln!("{}", err);
    }

    if let Err(e) = report::emit(&summary, settings.format, settings.output_path.as_deref()) {
        fail(&e, "Writing the report failed");
    }

    Ok(())
}

fn fail(e: &HistogramError, context: &str) -> ! {
    tracing::error!("❌ {}: {} (Severity: {:?})", context, e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

fn print_banner() {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "age-histogram".to_string());
    println!();
    println!("=== {} :: concurrent age histogram ===", program);
    println!();
    println!("Counts how many birth dates fall in each age, one YYYY-MM-DD date per line.");
    println!("Usage: {} <INPUT> [--workers N] [--strategy array|map] [--format text|csv|json]", program);
    println!("Run with --help for all options.");
}
