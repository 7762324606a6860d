mod app;
pub mod commands;

pub use app::{Cli, Commands};
pub use commands::config::ConfigSubcommands;
pub use commands::generate::GenerateArgs;
