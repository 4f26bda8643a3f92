//! Credentials File
//!
//! Reads the Certbot-style INI credentials file. Properties carry the
//! plugin prefix, so the API token lives under `dns_exonet_token`:
//!
//! ```ini
//! dns_exonet_token = 0123456789abcdef0123456789abcdef
//! ```

use config::{Config, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::DnsError;

/// Prefix Certbot puts in front of every property of this plugin.
pub const PROPERTY_PREFIX: &str = "dns_exonet_";

/// Properties the credentials file must define, with their descriptions.
pub const REQUIRED_PROPERTIES: &[(&str, &str)] = &[("token", "API token for Exonet API")];

/// Loaded credentials configuration
#[derive(Debug)]
pub struct CredentialsConfiguration {
    path: PathBuf,
    config: Config,
}

impl CredentialsConfiguration {
    /// Load and validate the credentials file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DnsError> {
        let path = path.as_ref().to_path_buf();
        debug!("Loading credentials from {}", path.display());

        if !path.is_file() {
            return Err(DnsError::Credentials(format!(
                "File not found: {}",
                path.display()
            )));
        }
        warn_on_unsafe_permissions(&path);

        let config = Config::builder()
            .add_source(File::from(path.as_path()).format(FileFormat::Ini))
            .build()?;

        let credentials = Self { path, config };
        credentials.require_properties()?;
        Ok(credentials)
    }

    /// Value of `property`, looked up as `dns_exonet_<property>` first and
    /// as the bare name second.
    pub fn conf(&self, property: &str) -> Option<String> {
        [format!("{}{}", PROPERTY_PREFIX, property), property.to_string()]
            .iter()
            .filter_map(|key| self.config.get_string(key).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn require_properties(&self) -> Result<(), DnsError> {
        let missing: Vec<String> = REQUIRED_PROPERTIES
            .iter()
            .filter(|(name, _)| self.conf(name).is_none())
            .map(|(name, description)| {
                format!(
                    "Property \"{}{}\" not found (should be {}).",
                    PROPERTY_PREFIX, name, description
                )
            })
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        Err(DnsError::Credentials(format!(
            "Missing property in credentials configuration file {}: {}",
            self.path.display(),
            missing.join(" ")
        )))
    }
}

#[cfg(unix)]
fn warn_on_unsafe_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            warn!(
                "Unsafe permissions on credentials configuration file: {} (mode {:o})",
                path.display(),
                mode & 0o777
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_on_unsafe_permissions(_path: &Path) {}
