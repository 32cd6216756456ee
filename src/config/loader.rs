//! Configuration loading.
//!
//! The kernel configuration is read from a well-known resource, either on the
//! upstream origin (through the [`Fetcher`]) or from a local file. Loading is
//! never fatal for the kernel: any failure logs a warning and yields the
//! built-in default. Host settings, by contrast, fail fast at startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::schema::{HostSettings, KernelConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::http::KernelRequest;
use crate::net::fetcher::{FetchError, Fetcher};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("configuration resource returned status {0}")]
    Status(StatusCode),

    #[error("parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where the kernel configuration lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path fetched from the upstream origin.
    Remote(String),
    /// Local file.
    File(PathBuf),
}

impl ConfigSource {
    /// Pick the source described by host settings.
    pub fn from_settings(settings: &HostSettings) -> Self {
        match &settings.kernel.config_file {
            Some(file) => ConfigSource::File(PathBuf::from(file)),
            None => ConfigSource::Remote(settings.kernel.config_resource.clone()),
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Remote(path) => write!(f, "remote:{}", path),
            ConfigSource::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Loads the kernel configuration, falling back to the default on failure.
#[derive(Clone)]
pub struct ConfigLoader {
    source: ConfigSource,
    fetcher: Arc<dyn Fetcher>,
}

impl ConfigLoader {
    pub fn new(source: ConfigSource, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { source, fetcher }
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Load the configuration; any failure yields the default.
    pub async fn load(&self) -> KernelConfig {
        match self.try_load().await {
            Ok(config) => {
                tracing::info!(
                    source = %self.source,
                    strategy = %config.kernel.caching_strategy,
                    routes = config.routes.len(),
                    mounts = config.namespace.mounts.len(),
                    "Kernel configuration loaded"
                );
                config
            }
            Err(e) => {
                tracing::warn!(source = %self.source, error = %e, "Failed to load kernel configuration, using defaults");
                KernelConfig::default()
            }
        }
    }

    /// Load the configuration, reporting why it failed.
    pub async fn try_load(&self) -> Result<KernelConfig, ConfigError> {
        let bytes = match &self.source {
            ConfigSource::Remote(path) => {
                let response = self.fetcher.fetch(KernelRequest::get(path.as_str())).await?;
                if !response.is_ok() {
                    return Err(ConfigError::Status(response.status));
                }
                response.body.to_vec()
            }
            ConfigSource::File(path) => tokio::fs::read(path).await?,
        };
        parse_config(&bytes)
    }
}

/// Parse and validate kernel configuration bytes.
pub fn parse_config(bytes: &[u8]) -> Result<KernelConfig, ConfigError> {
    let config: KernelConfig = serde_json::from_slice(bytes)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load host settings from a TOML file. A missing file yields defaults.
pub fn load_host_settings(path: &Path) -> Result<HostSettings, ConfigError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No host settings file, using defaults");
        return Ok(HostSettings::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::strategy::CachingStrategy;
    use crate::http::KernelResponse;
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;

    struct Fixed(Result<KernelResponse, FetchError>);

    impl Fetcher for Fixed {
        fn fetch(&self, _request: KernelRequest) -> BoxFuture<'_, Result<KernelResponse, FetchError>> {
            let outcome = self.0.clone();
            async move { outcome }.boxed()
        }
    }

    fn remote(outcome: Result<KernelResponse, FetchError>) -> ConfigLoader {
        ConfigLoader::new(ConfigSource::Remote("/kernel.config.json".into()), Arc::new(Fixed(outcome)))
    }

    #[tokio::test]
    async fn test_remote_config_loaded() {
        let body = r#"{ "kernel": { "cachingStrategy": "cache-first" } }"#;
        let loader = remote(Ok(KernelResponse::new(StatusCode::OK, body)));
        let config = loader.try_load().await.unwrap();
        assert_eq!(config.kernel.caching_strategy, CachingStrategy::CacheFirst);
    }

    #[tokio::test]
    async fn test_not_found_falls_back() {
        let loader = remote(Ok(KernelResponse::new(StatusCode::NOT_FOUND, "nope")));
        assert!(matches!(loader.try_load().await, Err(ConfigError::Status(StatusCode::NOT_FOUND))));
        assert_eq!(loader.load().await, KernelConfig::default());
    }

    #[tokio::test]
    async fn test_network_failure_falls_back() {
        let loader = remote(Err(FetchError::Network("refused".into())));
        assert!(matches!(loader.try_load().await, Err(ConfigError::Fetch(_))));
        assert_eq!(loader.load().await, KernelConfig::default());
    }

    #[tokio::test]
    async fn test_malformed_falls_back() {
        let loader = remote(Ok(KernelResponse::new(StatusCode::OK, "{ not json")));
        assert!(matches!(loader.try_load().await, Err(ConfigError::Json(_))));
        assert_eq!(loader.load().await, KernelConfig::default());
    }

    #[tokio::test]
    async fn test_invalid_falls_back() {
        let body = r#"{ "workers": { "pool": { "min": 8, "max": 2 } } }"#;
        let loader = remote(Ok(KernelResponse::new(StatusCode::OK, body)));
        assert!(matches!(loader.try_load().await, Err(ConfigError::Validation(_))));
        assert_eq!(loader.load().await, KernelConfig::default());
    }

    #[tokio::test]
    async fn test_file_source() {
        let path = std::env::temp_dir().join(format!("kernel-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{ "namespace": { "root": "/app" } }"#).unwrap();

        let loader = ConfigLoader::new(
            ConfigSource::File(path.clone()),
            Arc::new(Fixed(Err(FetchError::Network("unused".into())))),
        );
        assert_eq!(loader.load().await.namespace.root, "/app");

        std::fs::remove_file(&path).unwrap_or_default();
        assert_eq!(loader.load().await, KernelConfig::default());
    }

    #[test]
    fn test_missing_host_settings_default() {
        let settings = load_host_settings(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(settings.kernel.config_resource, "/kernel.config.json");
    }

    #[test]
    fn test_config_source_from_settings() {
        let mut settings = HostSettings::default();
        assert_eq!(
            ConfigSource::from_settings(&settings),
            ConfigSource::Remote("/kernel.config.json".into())
        );
        settings.kernel.config_file = Some("k.json".into());
        assert_eq!(ConfigSource::from_settings(&settings), ConfigSource::File("k.json".into()));
    }
}
