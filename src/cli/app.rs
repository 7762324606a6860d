use super::commands::config::ConfigCommands;
use super::commands::generate::GenerateArgs;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "radar-cli")]
#[command(about = "Generates the PYME cybersecurity radar report from SharePoint survey data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the survey and scoring workbooks, score them and upload the report
    Generate(GenerateArgs),
    /// Configuration management
    Config(ConfigCommands),
}
