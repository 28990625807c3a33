//! config/app_config.rs
//! Configuración global leída de variables de entorno (.env incluido).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Backend de persistencia de plantillas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateBackend {
    /// Tabla `message_templates` en SQLite
    Sqlite,
    /// Blob JSON en disco
    Local,
}

impl FromStr for TemplateBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" | "database" => Ok(TemplateBackend::Sqlite),
            "local" | "file" => Ok(TemplateBackend::Local),
            other => Err(anyhow!("TEMPLATE_BACKEND no soportado: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bot_api_url: String,
    pub bot_token: String,
    pub send_timeout_secs: u64,
    pub template_backend: TemplateBackend,
    pub templates_file: PathBuf,
    /// Identidad fija con la que se filtran las plantillas en SQLite
    pub template_user_id: String,
    pub database_path: PathBuf,
    pub server_host: String,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bot_api_url: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            send_timeout_secs: 30,
            template_backend: TemplateBackend::Sqlite,
            templates_file: PathBuf::from("data/templates.json"),
            template_user_id: "default".to_string(),
            database_path: PathBuf::from("data/crm.db"),
            server_host: "0.0.0.0".to_string(),
            server_port: 5022,
        }
    }
}

impl AppConfig {
    /// Lee la configuración del entorno. Se asume que `dotenv()` ya corrió.
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();

        let bot_token = env::var("BOT_TOKEN").map_err(|_| anyhow!("No se definió BOT_TOKEN"))?;

        let send_timeout_secs = match env::var("BOT_SEND_TIMEOUT_SECS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("BOT_SEND_TIMEOUT_SECS inválido: {}", v))?,
            Err(_) => defaults.send_timeout_secs,
        };

        let template_backend = match env::var("TEMPLATE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.template_backend,
        };

        let server_port = match env::var("SERVER_PORT") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("SERVER_PORT inválido: {}", v))?,
            Err(_) => defaults.server_port,
        };

        Ok(AppConfig {
            bot_api_url: env::var("BOT_API_URL").unwrap_or(defaults.bot_api_url),
            bot_token,
            send_timeout_secs,
            template_backend,
            templates_file: env::var("TEMPLATES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.templates_file),
            template_user_id: env::var("TEMPLATE_USER_ID").unwrap_or(defaults.template_user_id),
            database_path: env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
        })
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}
