//! Server configuration.
//!
//! Everything comes from environment variables and is read once at startup:
//! - `REPORTS_HOST`: bind address (default `127.0.0.1`)
//! - `REPORTS_PORT`: bind port (default `8080`)
//! - `GOOGLE_CLOUD_PROJECT`: project id (`GCLOUD_PROJECT` is accepted as a fallback)
//! - `REPORTS_BUCKET`: bucket for generated reports (`FIREBASE_STORAGE_BUCKET`
//!   as a fallback, then `<project>.appspot.com`)
//! - `FIRESTORE_EMULATOR_HOST`: `host:port` of a Firestore emulator
//! - `GOOGLE_OAUTH_ACCESS_TOKEN`: fixed bearer token for Firestore requests;
//!   when unset the metadata server is asked on every request

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid {name} value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub project_id: String,
    pub bucket: String,
    pub firestore_emulator_host: Option<String>,
    pub access_token: Option<String>,
}

impl ServerConfig {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get("REPORTS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match get("REPORTS_PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "REPORTS_PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let project_id = get("GOOGLE_CLOUD_PROJECT")
            .or_else(|| get("GCLOUD_PROJECT"))
            .ok_or(ConfigError::Missing("GOOGLE_CLOUD_PROJECT"))?;

        let bucket = get("REPORTS_BUCKET")
            .or_else(|| get("FIREBASE_STORAGE_BUCKET"))
            .unwrap_or_else(|| format!("{}.appspot.com", project_id));

        let config = Self {
            host,
            port,
            project_id,
            bucket,
            firestore_emulator_host: get("FIRESTORE_EMULATOR_HOST"),
            access_token: get("GOOGLE_OAUTH_ACCESS_TOKEN"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                name: "REPORTS_PORT",
                value: "0".to_string(),
            });
        }
        if self.project_id.contains('/') {
            return Err(ConfigError::Invalid {
                name: "GOOGLE_CLOUD_PROJECT",
                value: self.project_id.clone(),
            });
        }
        Ok(())
    }
}
