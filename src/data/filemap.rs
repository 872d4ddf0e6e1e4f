use std::path::Path;

// ---------------------------------------------------------------------------
// FileEntry / FileMap – resolved label → location mapping
// ---------------------------------------------------------------------------

/// One resolved data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Final path segment of the location (extension kept).
    pub label: String,
    /// Local path or remote URL, opaque to the resolver.
    pub location: String,
}

/// Ordered mapping from label to location.
///
/// Labels are unique. Inserting an existing label replaces its location but
/// keeps its original position, like an insertion-ordered dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMap {
    entries: Vec<FileEntry>,
}

impl FileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from raw locations. Empty locations are dropped, so a
    /// result made only of `""` collapses to an empty map.
    pub fn from_locations<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = FileMap::new();
        for loc in locations {
            let loc = loc.as_ref().trim();
            if loc.is_empty() {
                continue;
            }
            if let Some(label) = label_for(loc) {
                map.insert(label, loc.to_string());
            }
        }
        map
    }

    /// Insert or overwrite (last wins).
    pub fn insert(&mut self, label: String, location: String) {
        match self.entries.iter_mut().find(|e| e.label == label) {
            Some(existing) => existing.location = location,
            None => self.entries.push(FileEntry { label, location }),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.location.as_str())
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    pub fn locations(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.location.clone()).collect()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn first(&self) -> Option<&FileEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derive the label of a location: its final path segment.
///
/// Works for both local paths and URLs; query strings and fragments are
/// not part of the label.
pub fn label_for(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Derive the data label used inside the session: the file stem.
pub fn data_label_for(label: &str) -> String {
    Path::new(label)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(label)
        .to_string()
}

// ---------------------------------------------------------------------------
// Preference ranking
// ---------------------------------------------------------------------------

/// Label prefixes in order of preference. Unlisted labels sort last.
const PREFERENCES: &[&str] = &["mwmStar", "spec", "apStar"];

fn priority(label: &str) -> usize {
    PREFERENCES
        .iter()
        .position(|p| label.starts_with(p))
        .unwrap_or(usize::MAX)
}

/// Reorder a map by file preference. Stable, values untouched, idempotent.
pub fn rank(map: FileMap) -> FileMap {
    let mut entries = map.entries;
    // `sort_by_key` is a stable sort.
    entries.sort_by_key(|e| priority(&e.label));
    FileMap { entries }
}
