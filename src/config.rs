//! Configuration for the fsbucket server
//!
//! Settings are loaded once at startup from a YAML file, validated, and then
//! shared immutably (`Arc<Settings>`) with every request handler. There is no
//! dynamic bucket creation or credential rotation at runtime.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Server configuration: listen address, virtual-host suffix, and buckets.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    #[serde(default)]
    pub buckets: BTreeMap<String, BucketSettings>,
}

/// The `app` section of the settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// Address to listen on
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// DNS suffix for virtual-hosted bucket addressing. A request whose Host
    /// header is `<bucket>.<virtual_host>` is routed to `<bucket>`.
    pub virtual_host: String,
}

/// One configured bucket: a filesystem root plus its credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct BucketSettings {
    /// Absolute directory this bucket serves. No request may resolve a path
    /// outside it.
    pub root_path: PathBuf,

    #[serde(default)]
    pub credentials: Vec<Credential>,
}

/// A per-bucket access-key/secret-key pair with its permission flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub permission: PermissionSet,
}

/// Fixed-shape permission map. Fields absent from the settings file default
/// to `false`, so an incomplete permission block fails closed at load time
/// rather than at request time.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PermissionSet {
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub download: bool,
    #[serde(default)]
    pub upload: bool,
    #[serde(default)]
    pub mkdir: bool,
    #[serde(default)]
    pub delete: bool,
}

/// Actions a credential can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Download,
    Upload,
    Mkdir,
    Delete,
}

impl Action {
    /// Action name as it appears in settings and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Download => "download",
            Action::Upload => "upload",
            Action::Mkdir => "mkdir",
            Action::Delete => "delete",
        }
    }
}

impl PermissionSet {
    /// Whether this permission set grants the given action.
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::List => self.list,
            Action::Download => self.download,
            Action::Upload => self.upload,
            Action::Mkdir => self.mkdir,
            Action::Delete => self.delete,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    10080
}

impl Settings {
    /// Load settings from a YAML file and validate them.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML string and validate them.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `FSBUCKET_CONFIG` if set, otherwise from the
    /// default file locations.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("FSBUCKET_CONFIG") {
            return Self::from_file(&path);
        }

        for path in &["fsbucket.yaml", "/etc/fsbucket/config.yaml"] {
            if std::path::Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Err(ConfigError::NotFound)
    }

    /// Validate invariants that serde cannot express: absolute bucket roots
    /// and unique access-key ids within each bucket.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, bucket) in &self.buckets {
            if !bucket.root_path.is_absolute() {
                return Err(ConfigError::Validation(format!(
                    "bucket '{}': root_path must be absolute, got {:?}",
                    name, bucket.root_path
                )));
            }
            let mut seen = std::collections::HashSet::new();
            for cred in &bucket.credentials {
                if !seen.insert(cred.access_key_id.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "bucket '{}': duplicate access_key_id '{}'",
                        name, cred.access_key_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up a bucket by name.
    pub fn bucket(&self, name: &str) -> Option<&BucketSettings> {
        self.buckets.get(name)
    }

    /// Look up a credential of a bucket by access-key id.
    pub fn credential(&self, bucket: &str, access_key_id: &str) -> Option<&Credential> {
        self.bucket(bucket)?
            .credentials
            .iter()
            .find(|c| c.access_key_id == access_key_id)
    }

    /// Listen address as `host:port`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("No configuration file found (set FSBUCKET_CONFIG or create fsbucket.yaml)")]
    NotFound,
}
