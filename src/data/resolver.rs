use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::filemap::{rank, FileMap};
use crate::query::RequestParameters;

const USER_AGENT: &str = concat!("spectral-display/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Remote lookup collaborator
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("remote error: {0}")]
    Remote(String),
    #[error("lookup returned status {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(value: reqwest::Error) -> Self {
        LookupError::Remote(value.to_string())
    }
}

/// Finds the data files of a target in a data release.
pub trait TargetLookup {
    /// Locations in response order. Keys of the remote mapping are dropped.
    fn lookup(&self, target_id: &str, release: &str) -> Result<Vec<String>, LookupError>;
}

#[derive(Deserialize)]
struct PipelinesResponse {
    #[serde(default)]
    files: serde_json::Map<String, JsonValue>,
}

/// Client for the target pipelines endpoint of the lookup API.
pub struct ValisClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl ValisClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Stand-in used when no HTTP client could be built; every lookup fails.
pub struct Unavailable(pub String);

impl TargetLookup for Unavailable {
    fn lookup(&self, _target_id: &str, _release: &str) -> Result<Vec<String>, LookupError> {
        Err(LookupError::Remote(self.0.clone()))
    }
}

impl TargetLookup for ValisClient {
    fn lookup(&self, target_id: &str, release: &str) -> Result<Vec<String>, LookupError> {
        let url = format!("{}/target/pipelines/{target_id}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .json(&serde_json::json!({ "release": release }))
            .send()?;

        if !resp.status().is_success() {
            return Err(LookupError::Status(resp.status().as_u16()));
        }

        let body: PipelinesResponse = resp
            .json()
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        Ok(body
            .files
            .into_iter()
            .map(|(_, v)| match v {
                JsonValue::String(s) => s,
                // Missing pipelines come back as null; treat them as empty.
                _ => String::new(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// File resolution
// ---------------------------------------------------------------------------

/// Resolve request parameters to a ranked file map.
///
/// Never fails: lookup problems degrade to an empty map.
pub fn resolve(params: &RequestParameters, lookup: &dyn TargetLookup) -> FileMap {
    if let Some(files) = &params.explicit_files {
        let map = FileMap::from_locations(files.split(','));
        log::info!("Resolved {} explicit files", map.len());
        return rank(map);
    }

    if params.target_id.is_empty() {
        return FileMap::new();
    }

    match lookup.lookup(&params.target_id, &params.release) {
        Ok(locations) => {
            let map = rank(FileMap::from_locations(locations));
            log::info!(
                "Resolved {} files for target {} ({})",
                map.len(),
                params.target_id,
                params.release
            );
            map
        }
        Err(e) => {
            log::warn!("Lookup for target {} failed: {e}", params.target_id);
            FileMap::new()
        }
    }
}
