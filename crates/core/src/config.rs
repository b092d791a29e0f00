//! Application configuration.
//!
//! Values are layered: built-in defaults, then `~/.config/tienda/config.toml`,
//! then `TIENDA_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{checkout::DEFAULT_CHECKOUT_URL, notice::DEFAULT_NOTICE_SECS, save::CartSlot};

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "tienda";
/// Catalog document read when nothing else is configured.
pub const DEFAULT_CATALOG_SOURCE: &str = "productos.json";

/// Runtime settings for the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog location: an `http(s)://` URL or a local path.
    pub catalog_source: String,
    /// Endpoint receiving the checkout POST.
    pub checkout_url: String,
    /// Directory holding the persisted cart slot.
    pub data_root: PathBuf,
    /// Seconds a notice stays on screen.
    pub notice_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_source: DEFAULT_CATALOG_SOURCE.to_string(),
            checkout_url: DEFAULT_CHECKOUT_URL.to_string(),
            data_root: CartSlot::default_root(),
            notice_secs: DEFAULT_NOTICE_SECS,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load configuration using `path` as the (optional) file layer.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Self::default();
        let config = Config::builder()
            .set_default("catalog_source", defaults.catalog_source)?
            .set_default("checkout_url", defaults.checkout_url)?
            .set_default(
                "data_root",
                defaults.data_root.to_string_lossy().into_owned(),
            )?
            .set_default("notice_secs", defaults.notice_secs as i64)?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("TIENDA"))
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        config
            .try_deserialize()
            .context("failed to deserialize configuration")
    }
}

/// Location of the user configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write a commented default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(&config_path())
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, default_config_contents(&AppConfig::default()))
        .with_context(|| format!("failed to write {}", path.display()))
}

fn default_config_contents(defaults: &AppConfig) -> String {
    format!(
        "# Catalog document: local path or http(s) URL\n\
         catalog_source = {:?}\n\
         # Endpoint receiving the checkout request\n\
         checkout_url = {:?}\n\
         # Directory holding the persisted cart\n\
         data_root = {:?}\n\
         # Seconds a notice stays visible\n\
         notice_secs = {}\n",
        defaults.catalog_source,
        defaults.checkout_url,
        defaults.data_root.to_string_lossy(),
        defaults.notice_secs,
    )
}
