use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

const DEFAULT_LOG_DIRECTIVES: &str = "warn,dayflow=info";

fn directives_for(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("info,dayflow=debug"),
        _ => Some("debug,dayflow=trace"),
    }
}

/// Installs the global stderr subscriber. `RUST_LOG` is honoured unless `-v`
/// was given; calling this more than once is a no-op.
pub fn init_logging(verbosity: u8) -> Result<()> {
    if LOGGER_INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = match directives_for(verbosity) {
        Some(directives) => EnvFilter::try_new(directives),
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_DIRECTIVES)),
    }
    .context("failed to parse log directives")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    let _ = LOGGER_INIT.set(());
    Ok(())
}
