//! Reproduction notebooks.
//!
//! A notebook re-downloads the resolved files with `sdss_access` and loads
//! them into a fresh Specviz session, so a view can be reproduced outside
//! this application. Output is a pure function of its inputs.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::access::Locator;
use crate::data::filemap::FileMap;

pub const NOTEBOOK_MIME: &str = "application/x-ipynb+json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Markdown,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    pub source: String,
}

/// An ordered list of notebook cells plus the file name to save it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReproductionScript {
    pub filename: String,
    pub cells: Vec<Cell>,
}

// -- nbformat v4 document; fields in key order so output matches sorted keys --

#[derive(Serialize)]
struct NotebookDoc<'a> {
    cells: Vec<NotebookCell<'a>>,
    metadata: serde_json::Map<String, serde_json::Value>,
    nbformat: u32,
    nbformat_minor: u32,
}

#[derive(Serialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
enum NotebookCell<'a> {
    Code {
        execution_count: Option<u32>,
        metadata: serde_json::Map<String, serde_json::Value>,
        outputs: Vec<serde_json::Value>,
        source: Vec<&'a str>,
    },
    Markdown {
        metadata: serde_json::Map<String, serde_json::Value>,
        source: Vec<&'a str>,
    },
}

/// Split text into lines, keeping the line endings.
fn source_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

impl ReproductionScript {
    /// Serialize as an nbformat 4 document with one-space indentation.
    pub fn to_json(&self) -> Result<String, ExportError> {
        let doc = NotebookDoc {
            cells: self
                .cells
                .iter()
                .map(|c| match c.kind {
                    CellKind::Markdown => NotebookCell::Markdown {
                        metadata: Default::default(),
                        source: source_lines(&c.source),
                    },
                    CellKind::Code => NotebookCell::Code {
                        execution_count: None,
                        metadata: Default::default(),
                        outputs: Vec::new(),
                        source: source_lines(&c.source),
                    },
                })
                .collect(),
            metadata: Default::default(),
            nbformat: 4,
            nbformat_minor: 4,
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        doc.serialize(&mut ser)?;
        buf.push(b'\n');
        // serde_json only emits valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Wrote {NOTEBOOK_MIME} document to {}", path.display());
        Ok(())
    }
}

pub fn notebook_filename(target_id: &str) -> String {
    format!("sdss_jdaviz_notebook_{target_id}.ipynb")
}

/// Render a list of strings as a Python list literal.
fn python_list(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|s| format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect();
    format!("[{}]", quoted.join(", "))
}

fn python_str(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Build the reproduction notebook for the resolved files.
pub fn export(files: &FileMap, release: &str, target_id: &str, locator: &dyn Locator) -> ReproductionScript {
    let urls = locator.urls(release, &files.locations());

    let intro = format!(
        "# Jdaviz notebook\n\
         This notebook was generated to access SDSS data for target {target_id} with the \
         [jdaviz](https://jdaviz.readthedocs.io/en/latest/) Python package. Run it in a \
         Python virtual environment, e.g. **pyenv** or **miniconda**. Install the packages \
         first if needed:\n\
         ```\n\
         pip install -U sdss_access\n\
         pip install -U jdaviz\n\
         ```\n\
         \n\
         The data are downloaded with [sdss_access](https://sdss-access.readthedocs.io/en/latest). \
         Proprietary data require [SDSS authentication](https://sdss-access.readthedocs.io/en/latest/auth.html). \
         If you should have access but have no credentials, see the \
         [SDSS Data Access Wiki](https://wiki.sdss.org/display/DATA/Get+Started+with+SDSS+Data) \
         or contact the [SDSS Helpdesk](mailto:helpdesk@sdss.org).\n"
    );

    let imports = "import os\n\
                   from sdss_access import Access\n\
                   from jdaviz import Specviz\n"
        .to_string();

    let download = format!(
        "# set up sdss-access and download files\n\
         access = Access(release={release})\n\
         access.remote()\n\
         \n\
         # add the remote files\n\
         urls = {urls}\n\
         for url in urls:\n    \
             access.add_file(url, input_type='url')\n\
         \n\
         # stream the files and get the local paths\n\
         access.set_stream()\n\
         files = access.get_paths()\n\
         \n\
         # download the files\n\
         access.commit()\n",
        release = python_str(release),
        urls = python_list(&urls),
    );

    let display = "# load the data into Specviz\n\
                   spec = Specviz()\n\
                   for file in files:\n    \
                       spec.load_data(file)\n\
                   \n\
                   # display Specviz\n\
                   spec.show()\n"
        .to_string();

    ReproductionScript {
        filename: notebook_filename(target_id),
        cells: vec![
            Cell { kind: CellKind::Markdown, source: intro },
            Cell { kind: CellKind::Code, source: imports },
            Cell { kind: CellKind::Code, source: download },
            Cell { kind: CellKind::Code, source: display },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessMode, SasAccess};

    fn locator() -> SasAccess {
        SasAccess::new(AccessMode::Curl, "https://data.sdss5.org/", "/mnt/sas").unwrap()
    }

    fn files() -> FileMap {
        FileMap::from_locations([
            "/mnt/sas/ipl-3/spectro/astra/mwmStar-1.fits",
            "/mnt/sas/dr17/eboss/spectro/spec-1.fits",
        ])
    }

    #[test]
    fn test_export_is_deterministic() {
        let a = export(&files(), "IPL3", "23326", &locator()).to_json().unwrap();
        let b = export(&files(), "IPL3", "23326", &locator()).to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cells_and_filename() {
        let script = export(&files(), "IPL3", "23326", &locator());
        assert_eq!(script.filename, "sdss_jdaviz_notebook_23326.ipynb");
        let kinds: Vec<CellKind> = script.cells.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![CellKind::Markdown, CellKind::Code, CellKind::Code, CellKind::Code]
        );
        assert!(script.cells[0].source.contains("target 23326"));

        let download = &script.cells[2].source;
        assert!(download.contains(r#"access = Access(release="IPL3")"#));
        assert!(download.contains(
            "urls = ['https://data.sdss5.org/sas/ipl-3/spectro/astra/mwmStar-1.fits', \
             'https://data.sdss5.org/sas/dr17/eboss/spectro/spec-1.fits']"
        ));
    }

    #[test]
    fn test_notebook_json_shape() {
        let json = export(&FileMap::new(), "DR19", "", &locator()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["nbformat"], 4);
        let cells = value["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0]["cell_type"], "markdown");
        assert_eq!(cells[1]["cell_type"], "code");
        assert!(cells[1]["execution_count"].is_null());
        assert_eq!(cells[1]["source"][0], "import os\n");
        assert!(cells[2]["source"]
            .as_array()
            .unwrap()
            .iter()
            .any(|l| l == "urls = []\n"));
        assert!(json.starts_with("{\n \"cells\": ["));
    }

    #[test]
    fn test_python_literals_escape_quotes() {
        assert_eq!(python_list(&["a'b".to_string()]), r"['a\'b']");
        assert_eq!(python_str(r#"x"y"#), r#""x\"y""#);
    }

    #[test]
    fn test_write_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let script = export(&files(), "IPL3", "1", &locator());
        let path = dir.path().join(&script.filename);
        script.write_to(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), script.to_json().unwrap());
    }
}
