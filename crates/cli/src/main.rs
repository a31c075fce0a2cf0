use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use libris_kernel::settings::Settings;

/// Library catalog service
#[derive(Debug, Parser)]
#[command(name = "libris", version, about)]
struct Cli {
    /// Directory holding base.toml and per-environment overlays
    #[arg(long, global = true, env = "LIBRIS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Environment overlay to apply (local, staging, production)
    #[arg(long, global = true, env = "LIBRIS_ENV", default_value = "local")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the resolved settings as JSON and exit
    CheckConfig,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };
        Settings::load_from(&config_dir, &self.env)
            .with_context(|| format!("failed to load settings from '{}'", config_dir.display()))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = cli.settings()?;

    match cli.command {
        Command::CheckConfig => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            libris_telemetry::init(&settings.telemetry)?;
            tracing::info!(port = settings.server.port, "starting libris server");

            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(libris_app::run(settings))
        }
    }
}
