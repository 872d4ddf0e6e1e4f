use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

// ---------------------------------------------------------------------------
// RequestParameters – typed navigation input
// ---------------------------------------------------------------------------

pub const DEFAULT_RELEASE: &str = "IPL3";

/// Monotonic source of navigation generations. Generation 0 is never issued.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

/// Parameters of one navigation event. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParameters {
    /// Target identifier (`sdssid`); may be empty.
    pub target_id: String,
    pub release: String,
    /// Raw comma-separated explicit locations (`files`). `Some("")` still
    /// counts as an explicit (empty) list.
    pub explicit_files: Option<String>,
    pub theme: Option<Theme>,
    /// Strictly increasing per navigation; used to detect stale results.
    pub generation: u64,
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self {
            target_id: String::new(),
            release: DEFAULT_RELEASE.to_string(),
            explicit_files: None,
            theme: None,
            generation: next_generation(),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("malformed query segment '{0}': expected key=value")]
    MalformedPair(String),
    #[error("empty query key in segment '{0}'")]
    EmptyKey(String),
}

impl RequestParameters {
    /// Build parameters from individual fields (a navigation from the UI).
    pub fn new(target_id: &str, release: &str, explicit_files: Option<&str>) -> Self {
        let release = release.trim();
        Self {
            target_id: target_id.trim().to_string(),
            release: if release.is_empty() {
                DEFAULT_RELEASE.to_string()
            } else {
                release.to_string()
            },
            explicit_files: explicit_files.map(str::to_string),
            ..Self::default()
        }
    }

    /// Parse a navigational search string such as `sdssid=1&release=IPL3`.
    ///
    /// Segments are split on the first `=` only so values may contain `=`.
    /// Empty segments are ignored; a segment without `=` is rejected.
    pub fn parse(search: &str) -> Result<Self, QueryError> {
        let search = search.strip_prefix('?').unwrap_or(search);
        let mut params = RequestParameters::default();

        for segment in search.split('&') {
            if segment.is_empty() {
                continue;
            }
            let Some((raw_key, raw_value)) = segment.split_once('=') else {
                return Err(QueryError::MalformedPair(segment.to_string()));
            };
            let key = decode(raw_key);
            if key.is_empty() {
                return Err(QueryError::EmptyKey(segment.to_string()));
            }
            let value = decode(raw_value);

            match key.as_str() {
                "sdssid" => params.target_id = value.trim().to_string(),
                "release" => {
                    if !value.trim().is_empty() {
                        params.release = value.trim().to_string();
                    }
                }
                "files" => params.explicit_files = Some(value),
                "theme" => {
                    params.theme = match value.as_str() {
                        "dark" => Some(Theme::Dark),
                        "light" => Some(Theme::Light),
                        other => {
                            log::warn!("Ignoring unknown theme '{other}'");
                            None
                        }
                    }
                }
                other => log::debug!("Ignoring unknown query key '{other}'"),
            }
        }

        Ok(params)
    }

    /// Whether there is anything to resolve at all.
    pub fn has_inputs(&self) -> bool {
        !self.target_id.is_empty() || self.explicit_files.is_some()
    }

    /// Render back to a search string (used to re-launch the same view).
    pub fn to_search(&self) -> String {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        if !self.target_id.is_empty() {
            ser.append_pair("sdssid", &self.target_id);
        }
        ser.append_pair("release", &self.release);
        if let Some(files) = &self.explicit_files {
            ser.append_pair("files", files);
        }
        ser.finish()
    }
}

/// Join local paths into a `files` value.
///
/// The list is comma separated, so paths containing a comma are skipped.
pub fn join_file_list<I, P>(paths: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut kept = Vec::new();
    for path in paths {
        let path = path.as_ref().to_string_lossy().into_owned();
        if path.contains(',') {
            log::warn!("Skipping '{path}': commas are not allowed in file lists");
            continue;
        }
        kept.push(path);
    }
    kept.join(",")
}

/// Percent/plus-decode one query component.
fn decode(raw: &str) -> String {
    url::form_urlencoded::parse(format!("v={raw}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_query() {
        let p = RequestParameters::parse("?sdssid=23326&release=DR19&theme=dark").unwrap();
        assert_eq!(p.target_id, "23326");
        assert_eq!(p.release, "DR19");
        assert_eq!(p.explicit_files, None);
        assert_eq!(p.theme, Some(Theme::Dark));
    }

    #[test]
    fn test_defaults() {
        let p = RequestParameters::parse("").unwrap();
        assert_eq!(p.target_id, "");
        assert_eq!(p.release, DEFAULT_RELEASE);
        assert!(!p.has_inputs());
    }

    #[test]
    fn test_value_with_equals_splits_on_first() {
        let p = RequestParameters::parse("files=https://h/x.fits?a=b&sdssid=1").unwrap();
        assert_eq!(p.explicit_files.as_deref(), Some("https://h/x.fits?a=b"));
        assert_eq!(p.target_id, "1");
    }

    #[test]
    fn test_malformed_segment_is_rejected() {
        let err = RequestParameters::parse("sdssid=1&oops").unwrap_err();
        assert_eq!(err, QueryError::MalformedPair("oops".into()));
        assert!(matches!(
            RequestParameters::parse("=x"),
            Err(QueryError::EmptyKey(_))
        ));
    }

    #[test]
    fn test_empty_segments_and_files() {
        let p = RequestParameters::parse("sdssid=5&&files=&").unwrap();
        assert_eq!(p.explicit_files.as_deref(), Some(""));
        assert!(p.has_inputs());
    }

    #[test]
    fn test_percent_decoding() {
        let p = RequestParameters::parse("files=%2Fa%2Fb.fits%2C%2Fc.fits").unwrap();
        assert_eq!(p.explicit_files.as_deref(), Some("/a/b.fits,/c.fits"));
    }

    #[test]
    fn test_generations_increase() {
        let a = RequestParameters::parse("sdssid=1").unwrap();
        let b = RequestParameters::parse("sdssid=1").unwrap();
        assert!(b.generation > a.generation);
        assert_ne!(a, b);
    }

    #[test]
    fn test_file_list_skips_paths_with_commas() {
        let joined = join_file_list(["/data/spec-1.parquet", "/data/a,b/mwmStar-1.json", "/data/apStar-1.csv"]);
        assert_eq!(joined, "/data/spec-1.parquet,/data/apStar-1.csv");
        assert_eq!(join_file_list(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_search_round_trip() {
        let p = RequestParameters::new("42", "", Some("/a.fits,/b.fits"));
        let q = RequestParameters::parse(&p.to_search()).unwrap();
        assert_eq!(q.target_id, "42");
        assert_eq!(q.release, DEFAULT_RELEASE);
        assert_eq!(q.explicit_files.as_deref(), Some("/a.fits,/b.fits"));
    }
}
