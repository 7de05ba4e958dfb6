//! Target environments, layout modes and the endpoint preset table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::endpoints;

/// Deployment the widget talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    #[default]
    Production,
    Development,
    Custom,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Production,
        Environment::Development,
        Environment::Custom,
    ];

    /// Value written to storage
    pub fn storage_value(self) -> &'static str {
        match self {
            Environment::Production => "PRODUCTION",
            Environment::Development => "DEVELOPMENT",
            Environment::Custom => "CUSTOM",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Environment::Production => "Production",
            Environment::Development => "Development",
            Environment::Custom => "Custom",
        }
    }

    pub fn is_custom(self) -> bool {
        matches!(self, Environment::Custom)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "development" => Ok(Environment::Development),
            "custom" => Ok(Environment::Custom),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Widget layout used for the auth route
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IframeMode {
    #[default]
    Popup,
    Modal,
    Half,
    Sidebar,
}

impl IframeMode {
    pub const ALL: [IframeMode; 4] = [
        IframeMode::Popup,
        IframeMode::Modal,
        IframeMode::Half,
        IframeMode::Sidebar,
    ];

    pub fn storage_value(self) -> &'static str {
        match self {
            IframeMode::Popup => "popup",
            IframeMode::Modal => "modal",
            IframeMode::Half => "half",
            IframeMode::Sidebar => "sidebar",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IframeMode::Popup => "Popup",
            IframeMode::Modal => "Modal",
            IframeMode::Half => "Half",
            IframeMode::Sidebar => "Sidebar",
        }
    }
}

impl fmt::Display for IframeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_value())
    }
}

impl FromStr for IframeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "popup" => Ok(IframeMode::Popup),
            "modal" => Ok(IframeMode::Modal),
            "half" => Ok(IframeMode::Half),
            "sidebar" => Ok(IframeMode::Sidebar),
            other => Err(format!("unknown iframe mode '{other}'")),
        }
    }
}

/// Endpoint pair for one environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentPreset {
    pub name: &'static str,
    pub base_url: String,
    pub base_server_url: String,
}

/// Endpoints for `environment`.
///
/// Production and Development always return their fixed pair. Custom has no
/// fixed URLs and echoes `current` back unchanged.
pub fn resolve_preset(environment: Environment, current: (&str, &str)) -> EnvironmentPreset {
    let (base_url, base_server_url) = match environment {
        Environment::Production => (
            endpoints::PRODUCTION_BASE_URL,
            endpoints::PRODUCTION_BASE_SERVER_URL,
        ),
        Environment::Development => (
            endpoints::DEVELOPMENT_BASE_URL,
            endpoints::DEVELOPMENT_BASE_SERVER_URL,
        ),
        Environment::Custom => current,
    };

    EnvironmentPreset {
        name: environment.label(),
        base_url: base_url.to_string(),
        base_server_url: base_server_url.to_string(),
    }
}
