use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub admin_page: PathBuf,
    pub static_dir: PathBuf,
    pub smtp_host: String,
    pub email_user: Option<String>,
    pub email_pass: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        if dotenvy::dotenv().is_ok() {
            info!("Loaded environment from .env");
        }

        Ok(Self {
            port: try_load("PORT", "3000")?,
            db_path: try_load("DB_PATH", "db.json")?,
            admin_page: try_load("ADMIN_PAGE", "admin.html")?,
            static_dir: try_load("STATIC_DIR", "public")?,
            smtp_host: try_load("SMTP_HOST", "smtp.163.com")?,
            email_user: var("EMAIL_USER").ok(),
            email_pass: var("EMAIL_PASS").ok().or_else(|| read_secret("EMAIL_PASS")),
        })
    }

    /// Both halves of the relay login, if configured.
    pub fn mail_credentials(&self) -> Option<(&str, &str)> {
        match (&self.email_user, &self.email_pass) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            db_path: PathBuf::from("db.json"),
            admin_page: PathBuf::from("admin.html"),
            static_dir: PathBuf::from("public"),
            smtp_host: "smtp.163.com".to_string(),
            email_user: None,
            email_pass: None,
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
}
