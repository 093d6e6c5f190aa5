use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_AUTH_URL: &str =
    "https://functions.poehali.dev/0c03e394-967b-4944-8dcd-20502e60f6e6";
pub const DEFAULT_BALANCE_URL: &str =
    "https://functions.poehali.dev/8329b011-9af6-4665-9eb1-dbfdd09029df";
pub const DEFAULT_SUPPORT_HANDLE: &str = "BNESkvi";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Remote endpoints
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EndpointsConfig {
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub balance_url: Option<String>,
}

impl EndpointsConfig {
    pub fn auth_url(&self) -> &str {
        self.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL)
    }

    pub fn balance_url(&self) -> &str {
        self.balance_url.as_deref().unwrap_or(DEFAULT_BALANCE_URL)
    }
}

/// Where session data and activity logs live
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    /// Session key-value file (default ~/.tickpay/storage.json)
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Directory for per-run activity logs (default ~/.tickpay/activity)
    #[serde(default)]
    pub activity_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path
            .clone()
            .or_else(crate::storage::FileStore::default_path)
    }

    pub fn resolved_activity_dir(&self) -> Option<PathBuf> {
        self.activity_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".tickpay").join("activity")))
    }
}

/// Presentation settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub quick_amounts: Option<Vec<u32>>,
    #[serde(default)]
    pub support_handle: Option<String>,
}

const DEFAULT_QUICK_AMOUNTS: &[u32] = &[100, 500, 1000];

impl StorefrontConfig {
    /// Preset top-up amounts offered in the deposit dialog
    pub fn quick_amounts(&self) -> &[u32] {
        self.quick_amounts.as_deref().unwrap_or(DEFAULT_QUICK_AMOUNTS)
    }

    pub fn support_handle(&self) -> &str {
        self.support_handle
            .as_deref()
            .unwrap_or(DEFAULT_SUPPORT_HANDLE)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub storefront: StorefrontConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.tickpay/config.local.toml) > project (.tickpay/config.toml) > user (~/.tickpay/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".tickpay").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".tickpay").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Local overrides, should be gitignored
        let local_config = Path::new(".tickpay").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority).
    /// Values override only when set.
    pub fn merge(&mut self, other: Config) {
        if other.endpoints.auth_url.is_some() {
            self.endpoints.auth_url = other.endpoints.auth_url;
        }
        if other.endpoints.balance_url.is_some() {
            self.endpoints.balance_url = other.endpoints.balance_url;
        }

        if other.storage.path.is_some() {
            self.storage.path = other.storage.path;
        }
        if other.storage.activity_dir.is_some() {
            self.storage.activity_dir = other.storage.activity_dir;
        }

        if other.storefront.quick_amounts.is_some() {
            self.storefront.quick_amounts = other.storefront.quick_amounts;
        }
        if other.storefront.support_handle.is_some() {
            self.storefront.support_handle = other.storefront.support_handle;
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (field, url) in [
            ("endpoints.auth_url", self.endpoints.auth_url()),
            ("endpoints.balance_url", self.endpoints.balance_url()),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("Expected an http(s) URL, got '{}'", url),
                });
            }
        }

        if self.storefront.quick_amounts().is_empty() {
            errors.push(ValidationError {
                field: "storefront.quick_amounts".to_string(),
                message: "Must not be empty".to_string(),
            });
        }
        for (i, amount) in self.storefront.quick_amounts().iter().enumerate() {
            if *amount == 0 {
                errors.push(ValidationError {
                    field: format!("storefront.quick_amounts[{}]", i),
                    message: "Must be greater than 0".to_string(),
                });
            }
        }

        if self.storefront.support_handle().trim_start_matches('@').is_empty() {
            errors.push(ValidationError {
                field: "storefront.support_handle".to_string(),
                message: "Must not be empty".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
