use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keymod::core::builder::create_builder;
use keymod::core::config::{self, CONFIG_FILE};
use keymod::server::{run_server, AppState};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about = "Generate custom Android keyboard layout APKs", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keymod=info,tower_http=warn")),
        )
        .init();

    let args = Args::parse();
    args.command.run().await
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Build a signed APK from a KCM layout file
    Build {
        /// Path to the primary KCM layout file
        layout: PathBuf,
        /// Path to an optional secondary KCM layout file
        #[arg(long)]
        layout2: Option<PathBuf>,
        /// Output APK path
        #[arg(short, long, default_value = "keyboard-layout.apk")]
        output: PathBuf,
    },
}

impl Commands {
    pub async fn run(self) -> Result<()> {
        let config = config::parse_config(CONFIG_FILE);
        let builder = create_builder(&config)?;

        match self {
            Self::Serve { host, port } => {
                let state = AppState {
                    builder: Arc::new(builder),
                    resources: config::resources_dir(),
                };
                let host = host.unwrap_or(config.server.host);
                let port = port.unwrap_or(config.server.port);
                run_server(&host, port, state).await
            }
            Self::Build {
                layout,
                layout2,
                output,
            } => {
                let layout = fs::read_to_string(&layout)
                    .with_context(|| format!("reading layout `{}`", layout.display()))?;
                let layout2 = match &layout2 {
                    Some(path) => Some(
                        fs::read_to_string(path)
                            .with_context(|| format!("reading layout `{}`", path.display()))?,
                    ),
                    None => None,
                };

                let apk = builder.build_apk(&layout, layout2.as_deref())?;
                fs::write(&output, apk)
                    .with_context(|| format!("writing `{}`", output.display()))?;
                println!("Built APK: {}", output.display());
                Ok(())
            }
        }
    }
}
