use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tether::config::Config;
use tether::demo;
use tether::logging::init_tracing;
use tether::server::AppServer;
use tether::view::Services;

#[derive(Parser)]
#[command(name = "tether", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the demo application
    Serve {
        /// Config file (default: ~/.config/tether/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override server.bind_addr
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Validate a config file and print the effective settings
    CheckConfig {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, bind } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
                config.validate()?;
            }
            init_tracing(&config.logging)?;

            let mut server = AppServer::new(Arc::new(config), demo::factory(), Services::new());
            let addr = server.bind().await?;
            println!("tether listening on http://{addr}");
            server.run().await
        }
        Command::CheckConfig { config } => {
            let path = config.clone().unwrap_or_else(Config::config_path);
            let config = load_config(config.as_ref())?;
            let rendered = toml::to_string_pretty(&config).context("failed to render config")?;
            println!("# {} is valid", path.display());
            print!("{rendered}");
            Ok(())
        }
    }
}
