use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Filter used when `RUST_LOG` is not set.
pub fn filter_directive(debug: bool) -> &'static str {
    if debug {
        "id_gen=debug,info"
    } else {
        "id_gen=info"
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout only carries the summary.
pub fn init_logger(format: LogFormat, debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(debug)));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
    if let Err(e) = installed {
        eprintln!("Logger already initialised: {}", e);
    }
}
