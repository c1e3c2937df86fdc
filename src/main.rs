use clap::Parser;
use log::{debug, info};

use draftpress::{default_config_path, App, Cli, Config};

pub fn initialize_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            debug!("Failed to load configuration: {}", e);
            eprintln!("{} {}", console::style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    if let Some(drafts_file) = cli.drafts_file.clone() {
        config.drafts_file = drafts_file;
    }

    let result = match App::new(config, config_path, cli.verbose) {
        Ok(mut app) => app.run(cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        debug!("Command failed: {}", e);
        eprintln!("{} {}", console::style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
