use std::sync::OnceLock;

use serde::Deserialize;

#[derive(Deserialize, Debug, Default, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentBackend {
    #[default]
    Local,
    Memory,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,

    // attachments
    #[serde(default)]
    pub attachment_backend: AttachmentBackend,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Exact origin allowed to call the API; permissive when unset.
    pub allowed_origin: Option<String>,

    #[serde(default = "default_environment")]
    pub environment: String,

    // build
    #[serde(default = "default_local")]
    pub source: String,
    #[serde(default = "default_local")]
    pub git_commit: String,
    #[serde(default = "default_local")]
    pub pipeline_id: String,
    #[serde(default = "default_local")]
    pub version: String,
}

fn default_port() -> u16 {
    4000
}

fn default_database_url() -> String {
    "notes.db".into()
}

fn default_upload_dir() -> String {
    "uploads".into()
}

fn default_environment() -> String {
    "development".into()
}

fn default_local() -> String {
    "local".into()
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Self>().unwrap();

        config
    }

    /// Error responses carry internal detail only in development.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

#[cfg(test)]
pub fn config_override<F>(override_config: F) -> &'static Config
where
    F: FnOnce(Config) -> Config,
{
    CONFIG.get_or_init(|| override_config(Config::from_env()))
}
