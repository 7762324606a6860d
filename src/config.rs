use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration with file persistence.
///
/// Loaded once at startup and passed by parameter into the pipeline; the
/// scoring code never reads configuration on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_survey_path")]
    pub survey_path: String,
    #[serde(default = "default_rules_path")]
    pub rules_path: String,
    #[serde(default = "default_output_filename")]
    pub output_filename: String,
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_site_url() -> String {
    "marketingconsultia.sharepoint.com:/sites/BIDCiberseguridad".to_string()
}

fn default_survey_path() -> String {
    "Documentos compartidos/Encuesta sobre brechas digitales en ciberseguridad en PYMEs.xlsx"
        .to_string()
}

fn default_rules_path() -> String {
    "Documentos compartidos/puntajes.xlsx".to_string()
}

fn default_output_filename() -> String {
    "tabla_radar.xlsx".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            site_url: default_site_url(),
            survey_path: default_survey_path(),
            rules_path: default_rules_path(),
            output_filename: default_output_filename(),
            debug_mode: false,
        }
    }
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("radar-cli")
        } else {
            // Use home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".radar-cli")
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
            info!("Created config directory: {:?}", config_dir);
        }

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = Self::load_from_path(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", config_path);

        if !config_path.exists() {
            info!("Config file doesn't exist, using default config");
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        debug!("Saving config to: {:?}", config_path);

        let config_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Config saved successfully");
        Ok(())
    }

    /// Credentials can be supplied through the environment (or a .env file)
    /// instead of the config file.
    fn apply_env_overrides(&mut self) {
        for (var, field) in [
            ("RADAR_TENANT_ID", &mut self.tenant_id),
            ("RADAR_CLIENT_ID", &mut self.client_id),
            ("RADAR_CLIENT_SECRET", &mut self.client_secret),
        ] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    debug!("Overriding {} from environment", var);
                    *field = value;
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<String> {
        let value = match name {
            "tenant-id" => self.tenant_id.clone(),
            "client-id" => self.client_id.clone(),
            "client-secret" => self.client_secret.clone(),
            "site-url" => self.site_url.clone(),
            "survey-path" => self.survey_path.clone(),
            "rules-path" => self.rules_path.clone(),
            "output-filename" => self.output_filename.clone(),
            "debug-mode" => self.debug_mode.to_string(),
            _ => anyhow::bail!("Unknown setting: {}", name),
        };
        Ok(value)
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "tenant-id" => self.tenant_id = value.to_string(),
            "client-id" => self.client_id = value.to_string(),
            "client-secret" => self.client_secret = value.to_string(),
            "site-url" => self.site_url = value.to_string(),
            "survey-path" => self.survey_path = value.to_string(),
            "rules-path" => self.rules_path = value.to_string(),
            "output-filename" => {
                if value.trim().is_empty() {
                    anyhow::bail!("output-filename must not be empty");
                }
                self.output_filename = value.to_string();
            }
            "debug-mode" => {
                self.debug_mode = value.parse().map_err(|_| {
                    anyhow::anyhow!(
                        "Invalid value for debug-mode: '{}'. Must be 'true' or 'false'.",
                        value
                    )
                })?;
            }
            _ => anyhow::bail!("Unknown setting: {}", name),
        }
        Ok(())
    }

    pub fn setting_names() -> &'static [&'static str] {
        &[
            "tenant-id",
            "client-id",
            "client-secret",
            "site-url",
            "survey-path",
            "rules-path",
            "output-filename",
            "debug-mode",
        ]
    }
}
