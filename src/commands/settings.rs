use crate::config::Config;
use anyhow::Result;
use log::info;

/// Show the current configuration with the secret masked.
pub fn show_command(config: &Config) -> Result<()> {
    for name in Config::setting_names() {
        let value = if *name == "client-secret" {
            if config.client_secret.is_empty() {
                "(unset)".to_string()
            } else {
                "(set)".to_string()
            }
        } else {
            config.get(name)?
        };
        println!("{} = {}", name, value);
    }
    Ok(())
}

pub fn get_command(config: &Config, name: &str) -> Result<()> {
    println!("{}", config.get(name)?);
    Ok(())
}

pub fn set_command(name: &str, value: &str) -> Result<()> {
    info!("Setting {}", name);

    // Mutate the persisted config, not the env-overridden view.
    let mut config = Config::load_from_path(&Config::get_config_path()?)?;
    config.set(name, value)?;
    config.save()?;

    if name == "client-secret" {
        println!("Set {}", name);
    } else {
        println!("Set {} to {}", name, value);
    }
    Ok(())
}

pub fn path_command() -> Result<()> {
    println!("{}", Config::get_config_path()?.display());
    Ok(())
}
