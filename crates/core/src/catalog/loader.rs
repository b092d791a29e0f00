//! Catalog fetching from local files or HTTP.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use reqwest::Client;
use tracing::{info, warn};

use crate::{
    error::{Result, StoreError},
    models::Product,
};

use super::Catalog;

/// Where the catalog document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// Remote JSON document fetched over HTTP(S).
    Http(String),
    /// Local JSON file, relative paths resolve against the working directory.
    File(PathBuf),
}

impl CatalogSource {
    /// Interpret a configured source string.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Http(trimmed.to_string())
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches the product catalog document.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    client: Client,
    source: CatalogSource,
}

impl CatalogLoader {
    /// Loader with a default HTTP client.
    pub fn new(source: CatalogSource) -> Self {
        Self::with_client(Client::new(), source)
    }

    /// Loader sharing an existing HTTP client.
    pub fn with_client(client: Client, source: CatalogSource) -> Self {
        Self { client, source }
    }

    /// Configured catalog location.
    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    /// Fetch and decode the catalog. Nothing is retried.
    pub async fn load(&self) -> Result<Catalog> {
        let result = match &self.source {
            CatalogSource::Http(url) => self.fetch_remote(url).await,
            CatalogSource::File(path) => read_local(path).await,
        };
        match &result {
            Ok(catalog) => info!(source = %self.source, products = catalog.len(), "Catalog loaded"),
            Err(err) => warn!(source = %self.source, %err, "Catalog load failed"),
        }
        result
    }

    async fn fetch_remote(&self, url: &str) -> Result<Catalog> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| StoreError::catalog(url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::catalog(url, format!("server answered {status}")));
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| StoreError::catalog(url, err))?;
        decode(url, &body)
    }
}

async fn read_local(path: &Path) -> Result<Catalog> {
    let name = path.display().to_string();
    let body = tokio::fs::read(path)
        .await
        .map_err(|err| StoreError::catalog(&name, err))?;
    decode(&name, &body)
}

fn decode(source_name: &str, body: &[u8]) -> Result<Catalog> {
    let products: Vec<Product> =
        serde_json::from_slice(body).map_err(|err| StoreError::catalog(source_name, err))?;
    Ok(Catalog::new(products))
}
