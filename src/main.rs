use anyhow::Result;
use clap::Parser;
use log::info;

use radar_cli::cli::{Cli, Commands, ConfigSubcommands};
use radar_cli::commands::{generate, settings};
use radar_cli::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load()?;
    info!("Starting radar-cli");

    match cli.command {
        Commands::Generate(args) => generate::generate_command(&config, &args).await,
        Commands::Config(cmd) => match cmd.command {
            ConfigSubcommands::Show => settings::show_command(&config),
            ConfigSubcommands::Get { name } => settings::get_command(&config, &name),
            ConfigSubcommands::Set { name, value } => settings::set_command(&name, &value),
            ConfigSubcommands::Path => settings::path_command(),
        },
    }
}
