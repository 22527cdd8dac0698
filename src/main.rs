use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hbnb_console::{Config, Console, Registry, Reload, CORRUPT_FILE_NOTICE};

fn main() -> Result<()> {
    // Logs go to stderr so they never mix with command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hbnb_console=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::default();
    tracing::debug!(path = ?config.storage_path, version = hbnb_console::VERSION, "starting");

    let (mut registry, outcome) = Registry::open(&config.storage_path)
        .with_context(|| format!("failed to load {:?}", config.storage_path))?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    if outcome == Reload::Discarded {
        writeln!(stdout, "{}", CORRUPT_FILE_NOTICE)?;
    }

    Console::new(&mut registry, stdout)
        .with_prompt(config.prompt.clone())
        .run(stdin.lock())?;

    Ok(())
}
