use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::info;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::models::Contact;

const CONFIG_FILE: &str = "config.json";

static CONFIG_DIR_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Connection settings and the local identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api_url: String,
    pub hub_url: String,
    pub user_id: String,
    pub email: String,
    /// Shared token secret, base64-encoded on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_secret: Option<String>,
    pub muted: bool,
    pub notification_sound: String,
    pub sending_sound: String,
}

impl Config {
    pub fn new(api_url: &str, hub_url: &str, user_id: &str, email: &str) -> Self {
        Config {
            api_url: api_url.to_string(),
            hub_url: hub_url.to_string(),
            user_id: user_id.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    pub fn set_secret(&mut self, secret: &str) {
        self.token_secret = Some(BASE64.encode(secret));
    }

    pub fn secret(&self) -> Result<Vec<u8>> {
        let encoded = self
            .token_secret
            .as_ref()
            .ok_or_else(|| anyhow!("No token secret configured"))?;
        BASE64.decode(encoded).context("Token secret is not valid base64")
    }

    /// The local user as the rest of the client sees it.
    pub fn identity(&self) -> Contact {
        let mut user = Contact::new(self.user_id.clone(), self.email.clone());
        user.muted = self.muted;
        user.notification_sound = self.notification_sound.clone();
        user.sending_sound = self.sending_sound.clone();
        user
    }

    /// Apply `PARLEY_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("PARLEY_API_URL") {
            self.api_url = url;
        }
        if let Some(url) = lookup("PARLEY_HUB_URL") {
            self.hub_url = url;
        }
        if let Some(id) = lookup("PARLEY_USER_ID") {
            self.user_id = id;
        }
        if let Some(email) = lookup("PARLEY_EMAIL") {
            self.email = email;
        }
        if let Some(secret) = lookup("PARLEY_TOKEN_SECRET") {
            self.set_secret(&secret);
        }
    }

    /// Fields the client cannot run without.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_url.is_empty() {
            missing.push("apiUrl");
        }
        if self.hub_url.is_empty() {
            missing.push("hubUrl");
        }
        if self.user_id.is_empty() {
            missing.push("userId");
        }
        if self.token_secret.is_none() {
            missing.push("tokenSecret");
        }
        missing
    }

    pub fn load_from(path: &Path) -> Result<Option<Config>> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let config: Config =
            serde_json::from_reader(file).with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config for {} from {}", config.email, path.display());
        Ok(Some(config))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)?;
        info!("Config saved for {}", self.email);
        Ok(())
    }
}

/// Point the config directory somewhere else. Only the first call wins.
pub fn set_config_dir_override(dir: PathBuf) -> bool {
    CONFIG_DIR_OVERRIDE.set(dir).is_ok()
}

pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE.get() {
        return Ok(dir.clone());
    }
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("parley");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }
    Ok(config_dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Saved config plus environment overrides. Missing file yields a default config.
pub fn load_config() -> Result<Config> {
    let mut config = Config::load_from(&config_path()?)?.unwrap_or_default();
    config.apply_env();
    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    config.save_to(&config_path()?)
}
