use std::path::Path;

use serde::Deserialize;

fn default_prefix() -> char {
    '.'
}
fn default_redis_prefix() -> String {
    "ticketbot".to_string()
}
fn default_panel_refresh() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration of the process, read once at startup.
///
/// Everything that changes at runtime (roles, ticket category, archive channel)
/// lives in the [settings store](crate::settings) instead.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub token: String,
    #[serde(default = "default_prefix")]
    pub prefix: char,
    pub database_url: String,
    pub redis_url: String,
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
    /// Period of the panel reaction refresh, in minutes.
    #[serde(default = "default_panel_refresh")]
    pub panel_refresh_minutes: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self, String> {
        let filepath = filepath.as_ref();
        let str_config = std::fs::read_to_string(filepath)
            .map_err(|e| format!("Unable to read file {}: {}", filepath.to_string_lossy(), e))?;
        Self::parse(&str_config)
            .map_err(|e| format!("Unable to parse {}: {}", filepath.to_string_lossy(), e))
    }
    pub fn parse(content: &str) -> Result<Self, String> {
        let config: Config = serde_json::from_str(content).map_err(|e| e.to_string())?;
        if config.token.trim().is_empty() {
            return Err("the bot token is empty".to_string());
        }
        if config.panel_refresh_minutes == 0 {
            return Err("panel_refresh_minutes must be greater than zero".to_string());
        }
        Ok(config)
    }
    pub fn panel_refresh_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.panel_refresh_minutes * 60)
    }
}
