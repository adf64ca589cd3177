//! Bridge and admin settings, loaded from TOML.
//!
//! ```toml
//! caddy_bin = "/usr/bin/caddy"
//! admin_url = "http://localhost:2019"
//! validate_timeout_secs = 30
//! admin_timeout_secs = 10
//! validator = "admin"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::admin::{AdminClient, AdminError};
use crate::validate::{AdminValidator, CommandValidator, Validator};

/// Which authority validates text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    /// `caddy validate` subprocess.
    #[default]
    Command,
    /// Admin API `/adapt`.
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub caddy_bin: PathBuf,
    pub admin_url: String,
    pub validate_timeout_secs: u64,
    pub admin_timeout_secs: u64,
    pub validator: ValidatorKind,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            caddy_bin: PathBuf::from("caddy"),
            admin_url: "http://localhost:2019".to_string(),
            validate_timeout_secs: 30,
            admin_timeout_secs: 10,
            validator: ValidatorKind::Command,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Settings {
    /// Load settings from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub const fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.validate_timeout_secs)
    }

    #[must_use]
    pub const fn admin_timeout(&self) -> Duration {
        Duration::from_secs(self.admin_timeout_secs)
    }

    pub fn admin_client(&self) -> Result<AdminClient, AdminError> {
        AdminClient::new(self.admin_url.as_str(), self.admin_timeout())
    }

    /// The configured validating authority.
    pub fn validator(&self) -> Result<Box<dyn Validator>, AdminError> {
        Ok(match self.validator {
            ValidatorKind::Command => Box::new(CommandValidator::new(
                self.caddy_bin.clone(),
                self.validate_timeout(),
            )),
            ValidatorKind::Admin => Box::new(AdminValidator::new(AdminClient::new(
                self.admin_url.as_str(),
                self.validate_timeout(),
            )?)),
        })
    }
}
