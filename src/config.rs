// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration file loading.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` and `${VAR:default}` placeholders
//! 3. Parse YAML, TOML or JSON into [`NavigatorConfig`]
//! 4. Apply environment variable overrides
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! OPCUA_NAV_ENDPOINT=opc.tcp://plc-02:4840
//! OPCUA_NAV_DEFAULT_NAMESPACE=3
//! OPCUA_NAV_LOG_LEVEL=debug
//! OPCUA_NAV_LOG_FORMAT=json
//! ```

use std::env;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::types::{LogFormat, NavigatorConfig};

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loader for [`NavigatorConfig`] files.
///
/// # Examples
///
/// ```no_run
/// use opcua_navigator::config::ConfigLoader;
///
/// let config = ConfigLoader::new().load("navigator.yaml").unwrap();
/// println!("{}", config.endpoint);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve placeholders and apply overrides.
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `OPCUA_NAV` prefix.
    pub fn new() -> Self {
        Self {
            env_prefix: "OPCUA_NAV".to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholder resolution and overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is missing, has an unknown
    /// extension, fails to parse, or fails validation.
    pub fn load(&self, path: impl AsRef<Path>) -> OpcUaResult<NavigatorConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(OpcUaError::configuration(ConfigurationError::file_not_found(
                path,
            )));
        }
        let content = fs::read_to_string(path).map_err(|e| {
            OpcUaError::configuration(ConfigurationError::parse(
                path.display().to_string(),
                e.to_string(),
            ))
        })?;

        let format = ConfigFormat::from_path(path)?;
        let config = self.load_from_str(&content, format).map_err(|e| match e {
            OpcUaError::Configuration(ConfigurationError::Parse { message, .. }) => {
                OpcUaError::configuration(ConfigurationError::parse(
                    path.display().to_string(),
                    message,
                ))
            }
            other => other,
        })?;

        debug!(
            endpoint = %config.endpoint,
            default_namespace = config.default_namespace,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads configuration from a string in the given format.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if parsing or validation fails.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> OpcUaResult<NavigatorConfig> {
        let content = if self.resolve_env_vars {
            resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        let mut config = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Applies `<PREFIX>_*` environment overrides.
    fn apply_env_overrides(&self, config: &mut NavigatorConfig) -> OpcUaResult<()> {
        if let Ok(value) = env::var(format!("{}_ENDPOINT", self.env_prefix)) {
            config.endpoint = value;
        }
        if let Ok(value) = env::var(format!("{}_DEFAULT_NAMESPACE", self.env_prefix)) {
            config.default_namespace = value.parse().map_err(|_| {
                OpcUaError::configuration(ConfigurationError::invalid_env_var(
                    format!("{}_DEFAULT_NAMESPACE", self.env_prefix),
                    "expected a namespace index between 0 and 65535",
                ))
            })?;
        }
        if let Ok(value) = env::var(format!("{}_LOG_LEVEL", self.env_prefix)) {
            config.log_level = value;
        }
        if let Ok(value) = env::var(format!("{}_LOG_FORMAT", self.env_prefix)) {
            config.log_format = value.parse::<LogFormat>().map_err(|_| {
                OpcUaError::configuration(ConfigurationError::invalid_env_var(
                    format!("{}_LOG_FORMAT", self.env_prefix),
                    "expected text, json or compact",
                ))
            })?;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnsupportedFormat` for unknown extensions.
    pub fn from_path(path: &Path) -> OpcUaResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(OpcUaError::configuration(
                ConfigurationError::unsupported_format(other),
            )),
            None => Err(OpcUaError::configuration(
                ConfigurationError::unsupported_format("(no extension)"),
            )),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_str(content: &str, format: ConfigFormat) -> OpcUaResult<NavigatorConfig> {
    let parse_error =
        |message: String| OpcUaError::configuration(ConfigurationError::parse(format.extension(), message));

    match format {
        ConfigFormat::Yaml => ::config::Config::builder()
            .add_source(::config::File::from_str(content, ::config::FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| parse_error(e.to_string())),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Replaces `${VAR}` and `${VAR:default}` with environment values.
///
/// Unset variables without a default are left in place.
fn resolve_env_placeholders(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let placeholder = &after[..end];
        let (name, default) = match placeholder.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (placeholder, None),
        };

        match (env::var(name), default) {
            (Ok(value), _) => result.push_str(&value),
            (Err(_), Some(default)) => result.push_str(default),
            (Err(_), None) => {
                warn!("Environment variable '{}' not found", name);
                result.push_str(&rest[start..start + 2 + end + 1]);
            }
        }

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

// =============================================================================
// Tests
// =============================================================================
