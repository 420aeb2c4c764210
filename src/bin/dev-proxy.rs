//! Front-end development tooling: the `/api` dev proxy and the bundler
//! profile.

use anyhow::Result;
use clap::{Parser, Subcommand};

use storefront_api::config::{Environment, Settings};
use storefront_api::frontend::{proxy, FrontendBuildConfig};

#[derive(Parser)]
#[command(name = "dev-proxy")]
#[command(about = "Front-end dev proxy and build profile for the storefront API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the UI origin, forwarding the API prefix to API_URL
    Serve {
        /// Listen port (overrides DEV_PROXY_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory served for paths outside the API prefix
        #[arg(long)]
        static_dir: Option<String>,
    },
    /// Print the bundler profile as JSON
    BuildConfig {
        /// Build mode: development or production
        #[arg(short, long, env = "RUN_ENV", default_value = "development")]
        mode: Environment,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_unchecked()?.dev_proxy;

    match cli.command {
        Commands::Serve { port, static_dir } => {
            storefront_api::telemetry::init_tracing();
            if let Some(port) = port {
                settings.port = port;
            }
            if static_dir.is_some() {
                settings.static_dir = static_dir;
            }
            settings.validate()?;
            proxy::serve(&settings).await?;
        }
        Commands::BuildConfig { mode } => {
            settings.validate()?;
            println!("{}", FrontendBuildConfig::for_mode(mode, &settings).to_json()?);
        }
    }

    Ok(())
}
