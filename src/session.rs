use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use eframe::egui::Color32;

use crate::color::TraceColors;
use crate::data::filemap::{data_label_for, label_for};
use crate::data::format::SpecFormat;
use crate::data::loader;
use crate::data::model::Spectrum;

// ---------------------------------------------------------------------------
// Visualization session collaborator
// ---------------------------------------------------------------------------

/// A viewer session data files are loaded into.
pub trait VizSession {
    /// Labels of the files already present, without per-spectrum suffixes.
    fn loaded_labels(&self) -> BTreeSet<String>;

    /// Load a location. `None` format means auto-detect.
    fn load(&mut self, location: &str, format: Option<SpecFormat>, load_as_list: bool) -> Result<()>;
}

/// One data item shown in the viewer.
#[derive(Debug, Clone)]
pub struct DataItem {
    /// `<stem>` or `<stem> [i]` for items loaded from a list.
    pub label: String,
    /// File stem the item came from; what the loaded set is made of.
    pub data_label: String,
    pub location: String,
    pub format: Option<SpecFormat>,
    /// `None` when the viewer has no reader for the file.
    pub spectrum: Option<Spectrum>,
    pub color: Color32,
}

/// The embedded spectral viewer.
#[derive(Debug, Default)]
pub struct SpecvizSession {
    items: Vec<DataItem>,
    colors: TraceColors,
    /// Y-range requested by smart resizing; consumed by the plot.
    pending_y_range: Option<(f64, f64)>,
}

impl SpecvizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[DataItem] {
        &self.items
    }

    pub fn spectrum_count(&self) -> usize {
        self.items.iter().filter(|i| i.spectrum.is_some()).count()
    }

    fn push(
        &mut self,
        label: String,
        data_label: &str,
        location: &str,
        format: Option<SpecFormat>,
        spectrum: Option<Spectrum>,
    ) {
        let color = self.colors.color_for(&label);
        self.items.push(DataItem {
            label,
            data_label: data_label.to_string(),
            location: location.to_string(),
            format,
            spectrum,
            color,
        });
    }

    /// Clip the y-range when the first spectrum is dominated by outliers.
    pub fn smart_resize(&mut self) {
        let Some(range) = self
            .items
            .iter()
            .find_map(|i| i.spectrum.as_ref())
            .and_then(Spectrum::smart_y_range)
        else {
            return;
        };
        log::debug!("Smart resize y-range to {range:?}");
        self.pending_y_range = Some(range);
    }

    /// Take the y-range requested by the last smart resize, if any.
    pub fn take_y_range(&mut self) -> Option<(f64, f64)> {
        self.pending_y_range.take()
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

impl VizSession for SpecvizSession {
    fn loaded_labels(&self) -> BTreeSet<String> {
        self.items.iter().map(|i| i.data_label.clone()).collect()
    }

    fn load(&mut self, location: &str, format: Option<SpecFormat>, load_as_list: bool) -> Result<()> {
        let name = label_for(location).with_context(|| format!("no file name in '{location}'"))?;
        let stem = data_label_for(&name);
        let path = Path::new(location);

        if is_remote(location) || !loader::is_supported(path) {
            // No reader here: keep the entry so the file counts as loaded.
            if !is_remote(location) && !path.exists() {
                bail!("file not found: {location}");
            }
            log::info!(
                "Registered {stem} ({}) without preview",
                format.map_or("auto", |f| f.name())
            );
            self.push(stem.clone(), &stem, location, format, None);
            return Ok(());
        }

        let spectra = loader::load_file(path).with_context(|| format!("loading {location}"))?;
        if load_as_list {
            let n = spectra.len();
            for (i, sp) in spectra.into_iter().enumerate() {
                self.push(format!("{stem} [{i}]"), &stem, location, format, Some(sp));
            }
            log::info!("Loaded {n} spectra from {stem}");
        } else {
            let first = spectra.into_iter().next();
            self.push(stem.clone(), &stem, location, format, first);
            log::info!("Loaded {stem}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::load_selected;
    use crate::data::filemap::FileMap;
    use std::io::Write;

    fn json_file(dir: &Path, name: &str, rows: usize) -> String {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        let records: Vec<String> = (0..rows)
            .map(|i| format!(r#"{{"wavelength": [1.0, 2.0], "flux": [{i}.0, 1.0]}}"#))
            .collect();
        write!(file, "[{}]", records.join(",")).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_single_and_list_loading() {
        let dir = tempfile::tempdir().unwrap();
        let star = json_file(dir.path(), "mwmStar-1.json", 3);
        let visit = json_file(dir.path(), "mwmVisit-1.json", 3);

        let mut session = SpecvizSession::new();
        session.load(&star, Some(SpecFormat::SdssVMwm), false).unwrap();
        session.load(&visit, Some(SpecFormat::SdssVMwm), true).unwrap();

        let labels: Vec<&str> = session.items().iter().map(|i| i.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["mwmStar-1", "mwmVisit-1 [0]", "mwmVisit-1 [1]", "mwmVisit-1 [2]"]
        );
        assert_eq!(
            session.loaded_labels(),
            ["mwmStar-1", "mwmVisit-1"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<String>>()
        );
        assert_eq!(session.spectrum_count(), 4);
    }

    #[test]
    fn test_stem_with_spaces_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let single = json_file(dir.path(), "my star.json", 1);
        let list = json_file(dir.path(), "mwmVisit my star.json", 2);
        let files = FileMap::from_locations([single.as_str(), list.as_str()]);
        let selected = files.labels();

        let mut session = SpecvizSession::new();
        let first = load_selected(&selected, &files, &mut session);
        assert_eq!(first.loaded.len(), 2);
        let second = load_selected(&selected, &files, &mut session);
        assert!(second.loaded.is_empty());
        assert_eq!(second.skipped, selected);

        assert_eq!(session.items().len(), 3);
        assert!(session.loaded_labels().contains("my star"));
        assert!(session.loaded_labels().contains("mwmVisit my star"));
    }

    #[test]
    fn test_remote_files_are_registered() {
        let mut session = SpecvizSession::new();
        session
            .load("https://data.sdss5.org/sas/x/spec-1.fits", Some(SpecFormat::SdssSpec), false)
            .unwrap();
        assert!(session.loaded_labels().contains("spec-1"));
        assert!(session.items()[0].spectrum.is_none());
    }

    #[test]
    fn test_missing_local_file_fails() {
        let mut session = SpecvizSession::new();
        assert!(session.load("/does/not/exist/apStar-1.fits", None, false).is_err());
        assert!(session.loaded_labels().is_empty());
    }

    #[test]
    fn test_smart_resize_only_for_outliers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec-1.json");
        let mut flux = vec!["1.0".to_string(); 199];
        flux.push("5000.0".to_string());
        let wl: Vec<String> = (0..200).map(|i| format!("{i}.0")).collect();
        std::fs::write(
            &path,
            format!(r#"[{{"wavelength": [{}], "flux": [{}]}}]"#, wl.join(","), flux.join(",")),
        )
        .unwrap();

        let mut session = SpecvizSession::new();
        session.load(&path.to_string_lossy(), None, false).unwrap();
        session.smart_resize();
        assert!(session.take_y_range().is_some());
        assert!(session.take_y_range().is_none());
    }
}
