use clap::Parser;
use id_gen::utils::logger::{init_logger, LogFormat};
use id_gen::utils::validation::Validate;
use id_gen::{BatchEngine, CardPipeline, CliConfig, IdGenError, LocalStorage};

fn fail(e: &IdGenError) -> ! {
    tracing::error!(
        "❌ ID generation failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

fn main() {
    let mut config = CliConfig::parse();

    let format = if config.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_logger(format, config.debug);

    if config.debug {
        tracing::debug!("Debug mode enabled");
        tracing::debug!("template: {}", config.template.display());
        tracing::debug!("data: {}", config.data.display());
        tracing::debug!("images: {}", config.images.display());
        tracing::debug!("out: {}", config.out.display());
    }

    if let Err(e) = config.load_card_config().and_then(|()| config.validate()) {
        fail(&e);
    }

    let storage = LocalStorage::new(config.out.clone()).with_create_missing(config.create_out);
    let engine = BatchEngine::new(CardPipeline::new(storage, config));

    match engine.run() {
        Ok(report) => {
            println!(
                "✅ {} cards written to {} ({} skipped, {} photo warnings)",
                report.cards.len(),
                report.output_dir.display(),
                report.skipped.len(),
                report.warnings.len()
            );
            println!("\nDone.");
        }
        Err(e) => fail(&e),
    }
}
