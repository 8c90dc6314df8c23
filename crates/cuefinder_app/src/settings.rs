use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use cuefinder_engine::ServiceSettings;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "cuefinder.ron";

/// Contents of `cuefinder.ron`. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub listing_base_url: String,
    pub transcript_base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_body_bytes: u64,
    pub log_destination: LogDestination,
}

impl Default for AppSettings {
    fn default() -> Self {
        let services = ServiceSettings::default();
        Self {
            listing_base_url: services.listing_base_url,
            transcript_base_url: services.transcript_base_url,
            connect_timeout_secs: services.connect_timeout.as_secs(),
            request_timeout_secs: services.request_timeout.as_secs(),
            max_body_bytes: services.max_body_bytes,
            log_destination: LogDestination::default(),
        }
    }
}

/// Outcome of reading the settings file. Logging is not up yet when the file
/// is read, so a problem is handed back for the caller to report.
pub struct Loaded {
    pub settings: AppSettings,
    pub warning: Option<String>,
}

impl AppSettings {
    pub fn services(&self) -> ServiceSettings {
        ServiceSettings {
            listing_base_url: self.listing_base_url.clone(),
            transcript_base_url: self.transcript_base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_body_bytes,
        }
    }

    /// Reads `path`, falling back to defaults when it is missing or malformed.
    pub fn load(path: &Path) -> Loaded {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Loaded {
                    settings: Self::default(),
                    warning: None,
                };
            }
            Err(err) => {
                return Loaded {
                    settings: Self::default(),
                    warning: Some(format!("failed to read {path:?}, using defaults: {err}")),
                };
            }
        };

        match ron::from_str(&content) {
            Ok(settings) => Loaded {
                settings,
                warning: None,
            },
            Err(err) => Loaded {
                settings: Self::default(),
                warning: Some(format!("failed to parse {path:?}, using defaults: {err}")),
            },
        }
    }

    /// Writes the settings next to `path` and renames them into place.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
            .context("serializing settings")?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {dir:?}"))?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("writing {path:?}"))?;
        Ok(())
    }
}
