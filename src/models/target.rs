// Monitored endpoint as stored in the registry file

use serde::{Deserialize, Serialize};

/// A monitored endpoint. Accepts the legacy `ip` / `hostname` keys when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(alias = "ip")]
    pub address: String,
    #[serde(alias = "hostname", alias = "display_name", default)]
    pub display_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Target {
    pub fn new(address: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.into(),
            location: String::new(),
            enabled: true,
        }
    }

    /// Display name for probe samples; `None` when the registry leaves it blank.
    pub fn name(&self) -> Option<String> {
        if self.display_name.trim().is_empty() {
            None
        } else {
            Some(self.display_name.clone())
        }
    }
}

/// Partial update for a registry entry; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPatch {
    #[serde(alias = "hostname", alias = "display_name")]
    pub display_name: Option<String>,
    pub location: Option<String>,
    pub enabled: Option<bool>,
}
