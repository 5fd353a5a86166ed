use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Serialize, Deserialize};

use crate::config::env_vars::expand_env_vars;
use crate::constants::{
    DEFAULT_CONTENT_TYPE,
    DEFAULT_POST_TEMPLATE,
    DEFAULT_FIRST_EVENT_TEMPLATE,
    DEFAULT_SUBSEQUENT_EVENT_TEMPLATE,
};
use crate::output::template::EventTemplates;

/// Which destination behavior handles uploads.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Http,
    S3,
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputKind::Http => write!(f, "http"),
            OutputKind::S3 => write!(f, "s3"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub kind: OutputKind,
    /// Connection string handed to the destination: a URL for HTTP,
    /// `bucket` or `region:bucket` for S3.
    pub destination: String,
}

/// TLS policy shared by every HTTP client the forwarder builds.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TlsConfig {
    pub verify: bool,
    /// Extra PEM root certificate to trust
    pub ca_cert: Option<PathBuf>,
    /// PEM file holding a client certificate and its private key
    pub client_identity: Option<PathBuf>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        TlsConfig {
            verify: true,
            ca_cert: None,
            client_identity: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    /// Sent verbatim as the `Authorization` header when set
    pub authorization_token: Option<String>,
    pub content_type: String,
    pub post_template: String,
    pub first_event_template: String,
    pub subsequent_event_template: String,
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            authorization_token: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            post_template: DEFAULT_POST_TEMPLATE.to_string(),
            first_event_template: DEFAULT_FIRST_EVENT_TEMPLATE.to_string(),
            subsequent_event_template: DEFAULT_SUBSEQUENT_EVENT_TEMPLATE.to_string(),
            timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct S3Config {
    pub object_prefix: Option<String>,
    pub server_side_encryption: Option<String>,
    pub acl_policy: Option<String>,
    /// `profile` or `credentials-file-path:profile`
    pub credential_profile: Option<String>,
    /// Endpoint for S3-compatible storage; the region name is used as-is
    pub endpoint: Option<String>,
}

/// Resolved configuration consumed by the destination behaviors.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Configuration {
    pub output: OutputConfig,
    pub tls: TlsConfig,
    pub http: HttpConfig,
    pub s3: S3Config,
}

impl Configuration {
    /// Load configuration from a YAML file and expand environment variables
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: Configuration = serde_yaml::from_str(content)
            .context("Failed to parse YAML config")?;
        config.process_environment_variables();
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Create a default configuration YAML file
    pub fn create_default_config_file(path: &Path) -> Result<()> {
        Configuration::default().save_to_yaml_file(path)
    }

    /// Expand `$VAR` and `${VAR}` references in values that commonly come
    /// from the environment.
    pub fn process_environment_variables(&mut self) {
        self.output.destination = expand_env_vars(&self.output.destination);

        for value in [
            &mut self.http.authorization_token,
            &mut self.s3.object_prefix,
            &mut self.s3.credential_profile,
            &mut self.s3.endpoint,
        ] {
            if let Some(v) = value.as_mut() {
                *v = expand_env_vars(v);
            }
        }

        for path in [&mut self.tls.ca_cert, &mut self.tls.client_identity] {
            if let Some(p) = path.as_mut() {
                *p = PathBuf::from(expand_env_vars(&p.to_string_lossy()));
            }
        }
    }

    /// Reject configurations no destination could start from.
    pub fn validate(&self) -> Result<()> {
        if self.output.destination.trim().is_empty() {
            bail!("No destination configured for {} output", self.output.kind);
        }

        if self.output.kind == OutputKind::Http {
            EventTemplates::from_config(&self.http)
                .context("Invalid HTTP templates")?;
        }

        Ok(())
    }
}
