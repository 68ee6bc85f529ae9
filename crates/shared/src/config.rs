//! Application configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// External classifier configuration.
    pub classifier: ClassifierConfig,
    /// Bootstrap administrator account.
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    86_400 // 1 day
}

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl Default for StorageProvider {
    fn default() -> Self {
        Self::LocalFs {
            root: PathBuf::from("./uploads"),
        }
    }
}

impl StorageProvider {
    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
        }
    }
}

/// Object storage settings as loaded from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Provider and credentials.
    #[serde(default)]
    pub provider: StorageProvider,
    /// Base URL that stored object keys are appended to when building
    /// retrieval URLs.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Accepted upload MIME types.
    #[serde(default = "default_image_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            public_base_url: default_public_base_url(),
            max_file_size: default_max_file_size(),
            allowed_mime_types: default_image_mime_types(),
        }
    }
}

fn default_public_base_url() -> String {
    "http://localhost:5000/api/uploads".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_image_mime_types() -> Vec<String> {
    ["image/jpeg", "image/png", "image/webp", "image/gif"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// External classification process configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Executable to spawn (e.g. `python3` or a compiled classifier).
    pub program: String,
    /// Arguments placed before the image path, such as a script path.
    #[serde(default)]
    pub args: Vec<String>,
    /// Hard limit on a single classification run.
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
    /// Directory for per-analysis scratch copies of images. Made absolute on load.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// Timeout for downloading the image before classification.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

fn default_classifier_timeout() -> u64 {
    120
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("mycoguard-scratch")
}

fn default_download_timeout() -> u64 {
    30
}

/// Bootstrap administrator credentials.
///
/// When both fields are set and no administrator exists, one is created at
/// startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Administrator email.
    pub email: Option<String>,
    /// Administrator password.
    pub password: Option<String>,
}

impl AdminConfig {
    /// Returns the configured credentials when both are present and non-empty.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("MYCOGUARD")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("classifier.args")
                    .with_list_parse_key("storage.allowed_mime_types")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = config.try_deserialize()?;
        config.classifier.scratch_dir = std::path::absolute(&config.classifier.scratch_dir)
            .map_err(|e| config::ConfigError::Message(format!("classifier.scratch_dir: {e}")))?;
        Ok(config)
    }
}
