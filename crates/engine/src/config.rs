use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use execute::ExposeInternalErrors;
use serde::Deserialize;
use tracing_util::{ErrorVisibility, TraceableError};

const DEFAULT_SERVICE_NAME: &str = "odata-graphql";

/// Configuration of an engine, read from JSON.
///
/// ```json
/// {
///   "services": [{ "prefix": "trippin", "baseUrl": "https://services.odata.org/TripPinRESTierService" }],
///   "requestTimeoutSecs": 30
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    /// The OData services to expose, each under its own root field.
    pub services: Vec<ServiceConfig>,
    /// `User-Agent` of every request to the services.
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// The OpenTelemetry collector endpoint.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    /// Service name output in OpenTelemetry traces.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Whether internal errors should be shown or censored. Internal errors may contain
    /// sensitive information.
    #[serde(default)]
    pub expose_internal_errors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name of the service's root fields, and prefix of its GraphQL type names.
    pub prefix: String,
    pub base_url: String,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read the configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("the prefix {prefix} is used by more than one service")]
    DuplicatePrefix { prefix: String },
    #[error("the base URL {base_url} is used by more than one service")]
    DuplicateBaseUrl { base_url: String },
    #[error("the prefix {prefix:?} is not a valid GraphQL name")]
    InvalidPrefix { prefix: String },
}

impl TraceableError for ConfigError {
    fn visibility(&self) -> ErrorVisibility {
        ErrorVisibility::User
    }
}

impl EngineConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    pub fn expose_internal_errors(&self) -> ExposeInternalErrors {
        if self.expose_internal_errors {
            ExposeInternalErrors::Expose
        } else {
            ExposeInternalErrors::Censor
        }
    }

    /// The client shared by every service: one connection pool for all of them.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let user_agent = self.user_agent.clone().unwrap_or_else(|| {
            format!("{DEFAULT_SERVICE_NAME}/{}", env!("CARGO_PKG_VERSION"))
        });
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(seconds) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        builder.build()
    }

    /// Installs the log subscriber and the OTLP span exporter.
    pub fn initialize_tracing(&self) -> Result<(), tracing_util::TraceError> {
        tracing_util::initialize_tracing(
            self.otlp_endpoint.as_deref(),
            self.service_name.clone(),
            Some(env!("CARGO_PKG_VERSION")),
        )
    }
}

impl FromStr for EngineConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: EngineConfig = serde_json::from_str(s)?;
        validate_services(
            config
                .services
                .iter()
                .map(|service| (service.prefix.as_str(), service.base_url.as_str())),
        )?;
        Ok(config)
    }
}

/// Every prefix must be a GraphQL name, and no two services may share a prefix or a base URL.
pub(crate) fn validate_services<'a>(
    services: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<(), ConfigError> {
    let mut prefixes = HashSet::new();
    let mut base_urls = HashSet::new();
    for (prefix, base_url) in services {
        if !is_graphql_name(prefix) {
            return Err(ConfigError::InvalidPrefix {
                prefix: prefix.to_string(),
            });
        }
        if !prefixes.insert(prefix) {
            return Err(ConfigError::DuplicatePrefix {
                prefix: prefix.to_string(),
            });
        }
        if !base_urls.insert(base_url.trim_end_matches('/')) {
            return Err(ConfigError::DuplicateBaseUrl {
                base_url: base_url.to_string(),
            });
        }
    }
    Ok(())
}

/// `[_A-Za-z][_0-9A-Za-z]*`, without the `__` reserved for introspection.
pub(crate) fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        && !name.starts_with("__")
}
