use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured level; the format is either `json`
/// for machine consumption or `pretty` for terminals. When a file path is
/// configured the output goes there instead of stderr.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow::anyhow!("Invalid log level {:?}: {e}", config.level))?;

    let layer = match config.file_path.as_deref() {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            format_layer(&config.format, Arc::new(file))
        }
        None => format_layer(&config.format, std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(env_filter))
        .init();
    Ok(())
}

fn format_layer<W>(format: &str, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    if format == "json" {
        fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer().pretty().with_writer(writer).boxed()
    }
}
