use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{
    AnnouncementConfig, CertificateConfig, NotificationConfig, SchedulerConfig,
};

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub certificates: CertificateConfig,
    #[serde(default)]
    pub announcements: AnnouncementConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("PODIUM_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.phase_refresh_interval_secs", 60_i64)?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., PODIUM__DATABASE__URL)
            .add_source(Environment::with_prefix("PODIUM").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
