use crate::data::filemap::{data_label_for, FileMap};
use crate::data::format::{classify, is_multi_visit};
use crate::session::{SpecvizSession, VizSession};

// ---------------------------------------------------------------------------
// Load coordination: selection + file map → session load calls
// ---------------------------------------------------------------------------

/// Outcome of one load action.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    /// Already present in the session.
    pub skipped: Vec<String>,
    /// `(label, error)` for loads the session rejected.
    pub failed: Vec<(String, String)>,
}

impl LoadReport {
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} loaded", self.loaded.len())];
        if !self.skipped.is_empty() {
            parts.push(format!("{} already loaded", self.skipped.len()));
        }
        if !self.failed.is_empty() {
            parts.push(format!("{} failed", self.failed.len()));
        }
        parts.join(", ")
    }
}

/// Load every selected label the session does not hold yet, in selection order.
pub fn load_selected(selected: &[String], files: &FileMap, session: &mut dyn VizSession) -> LoadReport {
    let mut report = LoadReport::default();

    for label in selected {
        let Some(location) = files.get(label) else {
            log::warn!("Selected label {label} is not in the file map");
            continue;
        };
        let data_label = data_label_for(label);
        if session.loaded_labels().contains(&data_label) {
            report.skipped.push(label.clone());
            continue;
        }

        let format = classify(location);
        match session.load(location, format, is_multi_visit(&data_label)) {
            Ok(()) => report.loaded.push(label.clone()),
            Err(e) => {
                log::error!("Failed to load {label}: {e:#}");
                report.failed.push((label.clone(), format!("{e:#}")));
            }
        }
    }

    report
}

/// Load the top-ranked file into a fresh session and fit the y-range.
pub fn load_initial(files: &FileMap, session: &mut SpecvizSession) -> LoadReport {
    let Some(first) = files.first() else {
        return LoadReport::default();
    };
    let report = load_selected(&[first.label.clone()], files, session);
    if !report.loaded.is_empty() {
        session.smart_resize();
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::format::SpecFormat;
    use anyhow::{bail, Result};
    use std::collections::BTreeSet;

    /// Records load calls; the loaded set grows with every successful load.
    #[derive(Default)]
    struct RecordingSession {
        calls: Vec<(String, Option<SpecFormat>, bool)>,
        loaded: BTreeSet<String>,
        reject: Option<String>,
    }

    impl VizSession for RecordingSession {
        fn loaded_labels(&self) -> BTreeSet<String> {
            self.loaded.clone()
        }

        fn load(&mut self, location: &str, format: Option<SpecFormat>, load_as_list: bool) -> Result<()> {
            if self.reject.as_deref() == Some(location) {
                bail!("unreadable");
            }
            self.calls.push((location.to_string(), format, load_as_list));
            let name = location.rsplit('/').next().unwrap_or(location);
            self.loaded.insert(data_label_for(name));
            Ok(())
        }
    }

    fn files() -> FileMap {
        FileMap::from_locations([
            "/sas/astra/0.5/mwmStar-1.fits",
            "/sas/astra/0.5/mwmVisit-1.fits",
            "/sas/apogee/a/dr17/visit/apVisit-1.fits",
            "/elsewhere/other-1.fits",
        ])
    }

    fn labels(l: &[&str]) -> Vec<String> {
        l.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_calls_carry_format_and_list_flag() {
        let mut session = RecordingSession::default();
        let selected = labels(&["mwmStar-1.fits", "mwmVisit-1.fits", "apVisit-1.fits", "other-1.fits"]);
        let report = load_selected(&selected, &files(), &mut session);

        assert_eq!(report.loaded.len(), 4);
        assert_eq!(
            session.calls,
            vec![
                ("/sas/astra/0.5/mwmStar-1.fits".to_string(), Some(SpecFormat::SdssVMwm), false),
                ("/sas/astra/0.5/mwmVisit-1.fits".to_string(), Some(SpecFormat::SdssVMwm), true),
                ("/sas/apogee/a/dr17/visit/apVisit-1.fits".to_string(), Some(SpecFormat::ApogeeVisit), true),
                ("/elsewhere/other-1.fits".to_string(), None, false),
            ]
        );
    }

    #[test]
    fn test_repeated_load_is_idempotent() {
        let mut session = RecordingSession::default();
        let selected = labels(&["mwmStar-1.fits", "other-1.fits"]);

        load_selected(&selected, &files(), &mut session);
        let second = load_selected(&selected, &files(), &mut session);

        assert_eq!(session.calls.len(), 2);
        assert!(second.loaded.is_empty());
        assert_eq!(second.skipped, selected);
        assert_eq!(second.summary(), "0 loaded, 2 already loaded");
    }

    #[test]
    fn test_duplicate_selection_loads_once() {
        let mut session = RecordingSession::default();
        let selected = labels(&["other-1.fits", "other-1.fits"]);
        load_selected(&selected, &files(), &mut session);
        assert_eq!(session.calls.len(), 1);
    }

    #[test]
    fn test_failures_do_not_stop_remaining_loads() {
        let mut session = RecordingSession {
            reject: Some("/sas/astra/0.5/mwmStar-1.fits".into()),
            ..Default::default()
        };
        let selected = labels(&["mwmStar-1.fits", "other-1.fits", "missing.fits"]);
        let report = load_selected(&selected, &files(), &mut session);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.loaded, labels(&["other-1.fits"]));
        assert_eq!(report.summary(), "1 loaded, 1 failed");
    }

    #[test]
    fn test_initial_load_uses_first_entry() {
        let mut session = SpecvizSession::new();
        let remote = FileMap::from_locations(["https://data.sdss5.org/sas/x/mwmStar-9.fits"]);
        let report = load_initial(&remote, &mut session);
        assert_eq!(report.loaded, labels(&["mwmStar-9.fits"]));
        assert!(load_initial(&FileMap::new(), &mut session).loaded.is_empty());
    }
}
