use serde::{Deserialize, Serialize};
use url::Url;

// ---------------------------------------------------------------------------
// Locator – turns file locations into fully-qualified remote URLs
// ---------------------------------------------------------------------------

/// How the science archive is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// HTTP download; archive paths live under the `sas/` directory.
    #[default]
    Curl,
    /// rsync transfer; paths are relative to the module root.
    Rsync,
}

pub trait Locator {
    /// Resolve locations to remote URLs, skipping empty ones.
    fn urls(&self, release: &str, locations: &[String]) -> Vec<String>;
}

/// Science Archive Server locator.
#[derive(Debug, Clone)]
pub struct SasAccess {
    pub mode: AccessMode,
    pub remote: Url,
    /// Local mirror root, stripped from local paths.
    pub base_dir: String,
}

impl SasAccess {
    pub fn new(mode: AccessMode, remote: &str, base_dir: &str) -> Result<Self, url::ParseError> {
        // A trailing slash keeps `Url::join` from dropping the last segment.
        let remote = if remote.ends_with('/') {
            Url::parse(remote)?
        } else {
            Url::parse(&format!("{remote}/"))?
        };
        Ok(Self {
            mode,
            remote,
            base_dir: base_dir.trim_end_matches('/').to_string(),
        })
    }

    /// Strip the local mirror root, but only on a whole path component.
    fn strip_base<'a>(&self, location: &'a str) -> &'a str {
        if self.base_dir.is_empty() {
            return location;
        }
        match location.strip_prefix(self.base_dir.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => {
                log::debug!("'{location}' is outside the SAS mirror {}", self.base_dir);
                location
            }
        }
    }

    /// Resolve one location.
    pub fn url_for(&self, location: &str) -> Option<String> {
        let location = location.trim();
        if location.is_empty() {
            return None;
        }
        if location.starts_with("http://") || location.starts_with("https://") {
            return Some(location.to_string());
        }

        let relative = self.strip_base(location).trim_start_matches('/');
        let relative = relative
            .strip_prefix("sas/")
            .unwrap_or(relative);

        let path = match self.mode {
            AccessMode::Curl => format!("sas/{relative}"),
            AccessMode::Rsync => relative.to_string(),
        };

        match self.remote.join(&path) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                log::warn!("Cannot build URL for '{location}': {e}");
                None
            }
        }
    }
}

impl Locator for SasAccess {
    fn urls(&self, release: &str, locations: &[String]) -> Vec<String> {
        log::debug!("Resolving {} locations for release {release}", locations.len());
        locations.iter().filter_map(|l| self.url_for(l)).collect()
    }
}
