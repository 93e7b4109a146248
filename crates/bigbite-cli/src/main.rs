//! 🚀 bigbite-cli — the front door, the bouncer, the maitre d' of bigbite.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config, sets up
//! logging, wires Ctrl-C to the big red button, and then lets the real code do
//! the heavy lifting. Like a manager. 🦆

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bigbite::app_config::{AppConfig, SinkConfig, SourceConfig};
use bigbite::backends::FileSinkConfig;
use bigbite::{FetchErrorPolicy, render_summary};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 🪣 Read every object under an S3 prefix, line by line, into one file.
#[derive(Debug, Parser)]
#[command(name = "bigbite", version, about)]
struct Cli {
    /// 🔧 TOML config file. Only read if it exists; `BIGBITE_*` env vars fill in the rest.
    #[arg(default_value = "bigbite.toml")]
    config: PathBuf,

    /// 🧵 Number of fetch workers.
    #[arg(long)]
    workers: Option<usize>,

    /// 📂 Key prefix to harvest, overriding the config.
    #[arg(long)]
    prefix: Option<String>,

    /// 📝 Append records to this file instead of the configured sink.
    #[arg(long)]
    output: Option<PathBuf>,

    /// 🙈 Skip objects that fail to download instead of aborting the run.
    #[arg(long)]
    skip_failed: bool,

    /// 🤫 No spinner on stderr.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// 🎛️ Flags beat the config file. The config file beats the environment.
    fn apply_overrides(&self, app_config: &mut AppConfig) {
        if let Some(workers) = self.workers {
            app_config.runtime.workers = workers;
        }
        if let Some(prefix) = &self.prefix {
            match &mut app_config.source_config {
                SourceConfig::S3(s3) => s3.prefix = prefix.clone(),
            }
        }
        if let Some(output) = &self.output {
            app_config.sink_config = SinkConfig::File(FileSinkConfig {
                path: output.clone(),
                truncate: false,
            });
        }
        if self.skip_failed {
            app_config.runtime.on_fetch_error = FetchErrorPolicy::Skip;
        }
        if self.no_progress {
            app_config.runtime.progress = false;
        }
    }
}

/// 🔒 The config path, if there is really a file there.
fn existing_config_file(config_file: &Path) -> Result<Option<&Path>> {
    let exists = config_file.try_exists().with_context(|| {
        format!(
            "💀 Couldn't even check whether the config file exists. Permissions, maybe? \
             Was checking here: '{}'",
            config_file.display()
        )
    })?;
    Ok(exists.then_some(config_file))
}

/// 🚀 main() — where it all begins. The genesis. The big bang.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args
/// 3. Load config, then let the flags have the last word
/// 4. Run the thing, with Ctrl-C pulling the cord
/// 5. Print the summary, or the whole sad story
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_file = existing_config_file(&cli.config)?;
    if config_file.is_none() {
        info!(
            "🔧 no config file at '{}', going with the environment alone",
            cli.config.display()
        );
    }
    let mut app_config = bigbite::app_config::load_config(config_file).context(
        "💀 In bigbite-cli, main, we couldn't load the config. Take a look at the file and the \
         BIGBITE_* variables, make sure you didn't forget something obvious, like the bucket",
    )?;
    cli.apply_overrides(&mut app_config);

    // 🛑 the big red button: Ctrl-C cancels the root, listing and fetching are its children
    let cancel = CancellationToken::new();
    let the_button = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Ctrl-C received, stopping the harvest");
            the_button.cancel();
        }
    });

    match bigbite::run(app_config, cancel).await {
        Ok(report) => {
            // -- 📺 stderr, because stdout may well be the sink
            eprintln!("{}", render_summary(&report));
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion of sadness, one layer at a time
            let mut the_vibes_are_giving_connection_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("dispatch failure")
                    || cause_str.contains("connection refused")
                    || cause_str.contains("Connection refused")
                    || cause_str.contains("dns error")
                {
                    the_vibes_are_giving_connection_issues = true;
                }
            }
            if the_vibes_are_giving_connection_issues {
                error!(
                    "🔧 hint: looks like the object store isn't reachable. \
                     Double-check `endpoint_url`, the region, and your network. \
                     If you're pointing at a local MinIO, try `docker ps` to see if it's up. ☕"
                );
            }
            // 🗑️ Exit with prejudice. Process exitus maximus.
            std::process::exit(1);
        }
    }
}
