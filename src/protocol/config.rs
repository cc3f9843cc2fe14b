//! Provider configuration
//!
//! Where to send chat requests and how to authenticate. The token is never
//! serialized and never shows up in `Debug` output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, ErrorContext, Result};

pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// API flavor of the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFlavor {
    OpenAi,
    Azure,
    LocalAi,
}

impl ApiFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiFlavor::OpenAi => "openai",
            ApiFlavor::Azure => "azure",
            ApiFlavor::LocalAi => "localai",
        }
    }

    /// Flavors that speak the plain OpenAI chat completions dialect.
    pub fn is_openai_compatible(&self) -> bool {
        matches!(self, ApiFlavor::OpenAi | ApiFlavor::LocalAi)
    }
}

impl fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiFlavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "openai" => Ok(ApiFlavor::OpenAi),
            "azure" => Ok(ApiFlavor::Azure),
            "localai" => Ok(ApiFlavor::LocalAi),
            other => Err(Error::configuration_with_context(
                format!("api type {} not supported", other),
                ErrorContext::new()
                    .with_field_path("provider.type")
                    .with_details("expected one of: openai, azure, localai")
                    .with_source("provider_config"),
            )),
        }
    }
}

fn default_api_type() -> String {
    ApiFlavor::OpenAi.as_str().to_string()
}

/// Connection settings for one provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Raw API flavor; validated by [`ProviderConfig::flavor`] before any request is built.
    #[serde(rename = "type", default = "default_api_type")]
    pub api_type: String,
    pub base: String,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    /// Azure API version override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Where the configuration came from (env, file); diagnostic only.
    #[serde(default, skip_serializing)]
    pub source: Option<String>,
}

impl ProviderConfig {
    pub fn new(flavor: ApiFlavor, base: impl Into<String>) -> Self {
        Self {
            api_type: flavor.as_str().to_string(),
            base: base.into(),
            token: None,
            version: None,
            source: None,
        }
    }

    pub fn openai(base: impl Into<String>) -> Self {
        Self::new(ApiFlavor::OpenAi, base)
    }

    pub fn azure(base: impl Into<String>) -> Self {
        Self::new(ApiFlavor::Azure, base)
    }

    pub fn localai(base: impl Into<String>) -> Self {
        Self::new(ApiFlavor::LocalAi, base)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn flavor(&self) -> Result<ApiFlavor> {
        self.api_type.parse()
    }

    /// Base URL without trailing slashes.
    pub fn trimmed_base(&self) -> &str {
        self.base.trim_end_matches('/')
    }

    /// Load from the process environment.
    ///
    /// - `OPENAI_API_TYPE` (default `openai`), `OPENAI_API_BASE`, `OPENAI_API_KEY`, `OPENAI_API_VERSION`
    /// - otherwise `AZURE_OPENAI_ENDPOINT` / `AZURE_OPENAI_API_KEY` select Azure
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ProviderConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if get("OPENAI_API_BASE").is_none() && get("OPENAI_API_KEY").is_none() {
            if let Some(endpoint) = get("AZURE_OPENAI_ENDPOINT") {
                let mut cfg = Self::azure(endpoint).with_source("env: AZURE_OPENAI_ENDPOINT");
                cfg.token = get("AZURE_OPENAI_API_KEY");
                cfg.version = get("AZURE_OPENAI_API_VERSION");
                return Ok(cfg);
            }
        }

        let api_type = get("OPENAI_API_TYPE").unwrap_or_else(default_api_type);
        let flavor: ApiFlavor = api_type.parse()?;
        let base = match get("OPENAI_API_BASE") {
            Some(base) => base,
            None if flavor == ApiFlavor::OpenAi => DEFAULT_OPENAI_BASE.to_string(),
            None => {
                return Err(Error::configuration_with_context(
                    "missing base url",
                    ErrorContext::new()
                        .with_field_path("OPENAI_API_BASE")
                        .with_details(format!("required for api type {}", flavor))
                        .with_source("provider_config"),
                ))
            }
        };

        let mut cfg = Self::new(flavor, base).with_source("env: OPENAI_API_BASE");
        cfg.token = get("OPENAI_API_KEY");
        cfg.version = get("OPENAI_API_VERSION");
        Ok(cfg)
    }

    /// Parse a YAML (or JSON) provider document.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| {
            Error::configuration_with_context(
                "invalid provider configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("provider_config"),
            )
        })
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_type", &self.api_type)
            .field("base", &self.base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("version", &self.version)
            .field("source", &self.source)
            .finish()
    }
}
