//! Environment-driven configuration with logged defaults.

use std::env;
use std::path::PathBuf;

use tracing::{info, warn};

const DEFAULT_DB_PATH: &str = "data/words.db";
const DEFAULT_USER: &str = "admin";
const DEFAULT_PASSWORD: &str = "admin";
const DEFAULT_PORT: u16 = 8000;

pub struct Config {
    pub db_path: PathBuf,
    pub admin_user: String,
    pub admin_password: String,
    pub port: u16,
}

impl Config {
    pub fn load() -> Self {
        if env::var("APP_USER").is_err() || env::var("APP_PASSWORD").is_err() {
            warn!("APP_USER or APP_PASSWORD not set, using default credentials");
        }

        Self {
            db_path: PathBuf::from(load_or("APP_DB_PATH", DEFAULT_DB_PATH)),
            admin_user: load_or("APP_USER", DEFAULT_USER),
            admin_password: load_or("APP_PASSWORD", DEFAULT_PASSWORD),
            port: load_port(),
        }
    }
}

fn load_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn load_port() -> u16 {
    match env::var("APP_PORT") {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("invalid APP_PORT value '{raw}': {e}, using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    }
}
