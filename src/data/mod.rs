/// Data layer: file resolution, ranking, classification and local loading.
///
/// Architecture:
/// ```text
///  RequestParameters (sdssid / release / files)
///        │
///        ▼
///   ┌──────────┐
///   │ resolver  │  remote lookup or explicit list → FileMap
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ filemap   │  last-wins labels, preference ranking
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  format   │  path pattern → SpecFormat, multi-visit flag
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  local .parquet / .json / .csv → Vec<Spectrum>
///   └──────────┘
/// ```

pub mod filemap;
pub mod format;
pub mod loader;
pub mod model;
pub mod resolver;
