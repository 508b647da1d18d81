use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command emitted at the start of every script line unless overridden.
pub const DEFAULT_TOOL: &str = "/sbin/iptables";

/// Errors returned when gateway settings are not well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("gateway setting '{0}' must not be empty")]
    Empty(&'static str),
    #[error("gateway setting '{field}' must not contain whitespace: '{value}'")]
    Whitespace { field: &'static str, value: String },
}

/// Addresses and interface names of the gateway host.
///
/// Values are treated as opaque tokens and written into commands verbatim; the
/// only checks are that each is non-empty and contains no whitespace, which
/// would otherwise split a command argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    wan_ip: String,
    wan_interface: String,
    lan_ip: String,
    lan_interface: String,
    #[serde(default = "default_tool")]
    tool: String,
}

impl GatewayConfig {
    /// Build a config using [`DEFAULT_TOOL`].
    pub fn new(
        wan_ip: impl Into<String>,
        wan_interface: impl Into<String>,
        lan_ip: impl Into<String>,
        lan_interface: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            wan_ip: wan_ip.into(),
            wan_interface: wan_interface.into(),
            lan_ip: lan_ip.into(),
            lan_interface: lan_interface.into(),
            tool: default_tool(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the command path written at the start of every line.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Result<Self, ConfigError> {
        self.tool = tool.into();
        self.validate()?;
        Ok(self)
    }

    /// Check every field is a single non-empty token.
    ///
    /// Deserialized configs bypass [`GatewayConfig::new`], so callers loading
    /// from a file must call this before use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in self.fields() {
            if value.is_empty() {
                return Err(ConfigError::Empty(field));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(ConfigError::Whitespace {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn wan_ip(&self) -> &str {
        &self.wan_ip
    }

    pub fn wan_interface(&self) -> &str {
        &self.wan_interface
    }

    pub fn lan_ip(&self) -> &str {
        &self.lan_ip
    }

    pub fn lan_interface(&self) -> &str {
        &self.lan_interface
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("wan_ip", &self.wan_ip),
            ("wan_interface", &self.wan_interface),
            ("lan_ip", &self.lan_ip),
            ("lan_interface", &self.lan_interface),
            ("tool", &self.tool),
        ]
    }
}

fn default_tool() -> String {
    DEFAULT_TOOL.to_string()
}
