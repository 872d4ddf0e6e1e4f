use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::access::SasAccess;
use crate::config::Settings;
use crate::coordinator::{self, LoadReport};
use crate::data::filemap::FileMap;
use crate::data::resolver::{resolve, TargetLookup, Unavailable, ValisClient};
use crate::export::{self, ReproductionScript};
use crate::query::{RequestParameters, Theme};
use crate::session::SpecvizSession;

// ---------------------------------------------------------------------------
// Selection state
// ---------------------------------------------------------------------------

/// Resolved files and the user's selection for one navigation generation.
///
/// Invariant: `selected ⊆ available`, and `available` always reflects the
/// committed file map.
#[derive(Debug, Default)]
pub struct SelectionState {
    generation: u64,
    files: FileMap,
    /// A result was committed for `generation`.
    resolved: bool,
    in_flight: bool,
    last_attempt: Option<Instant>,
    /// `available`/`selected` were derived from the current non-empty map.
    derived: bool,
    available: Vec<String>,
    selected: Vec<String>,
}

impl SelectionState {
    /// Fresh, empty state tracking the given navigation generation.
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn files(&self) -> &FileMap {
        &self.files
    }

    pub fn available_labels(&self) -> &[String] {
        &self.available
    }

    pub fn selected_labels(&self) -> &[String] {
        &self.selected
    }

    pub fn is_resolving(&self) -> bool {
        self.in_flight
    }

    /// Whether a (re)resolution should start now.
    ///
    /// Resolves once per generation; an empty result from a remote lookup
    /// is retried after `retry` has elapsed since the last attempt.
    pub fn needs_resolution(&self, params: &RequestParameters, now: Instant, retry: Duration) -> bool {
        if self.in_flight || params.generation != self.generation || !params.has_inputs() {
            return false;
        }
        if !self.resolved {
            return true;
        }
        if !self.files.is_empty() || params.explicit_files.is_some() {
            return false;
        }
        self.last_attempt
            .map_or(true, |t| now.saturating_duration_since(t) >= retry)
    }

    /// Mark a resolution as started.
    pub fn begin(&mut self, now: Instant) {
        self.in_flight = true;
        self.last_attempt = Some(now);
    }

    /// Commit a resolution result. Results for an older generation are
    /// dropped so a slow response cannot overwrite newer state.
    pub fn commit(&mut self, generation: u64, files: FileMap) -> bool {
        if generation != self.generation {
            log::debug!(
                "Discarding stale resolution for generation {generation} (current {})",
                self.generation
            );
            return false;
        }
        self.in_flight = false;
        self.resolved = true;
        if files != self.files {
            self.files = files;
            self.derived = false;
        }
        self.derive();
        true
    }

    /// Populate `available`/`selected` from the file map. Runs at most once
    /// per map so later calls never clobber the user's selection.
    pub fn derive(&mut self) {
        if self.derived {
            return;
        }
        if self.files.is_empty() {
            self.available.clear();
            self.selected.clear();
            return;
        }
        self.available = self.files.labels();
        self.selected = self.available.first().cloned().into_iter().collect();
        self.derived = true;
    }

    /// Replace the selection. Unknown labels and repeats are dropped.
    pub fn set_selected<I>(&mut self, labels: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut selected: Vec<String> = Vec::new();
        for label in labels {
            if self.available.contains(&label) && !selected.contains(&label) {
                selected.push(label);
            }
        }
        self.selected = selected;
    }

    /// Add or remove one label from the selection.
    pub fn toggle(&mut self, label: &str) {
        if let Some(pos) = self.selected.iter().position(|l| l == label) {
            self.selected.remove(pos);
        } else if self.available.iter().any(|l| l == label) {
            self.selected.push(label.to_string());
        }
    }

    pub fn is_selected(&self, label: &str) -> bool {
        self.selected.iter().any(|l| l == label)
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// A finished resolution travelling back from the worker thread.
struct Resolution {
    generation: u64,
    files: FileMap,
}

/// Text fields of the navigation form.
#[derive(Debug, Clone, Default)]
pub struct NavigationInputs {
    pub target_id: String,
    pub release: String,
    pub files: String,
}

impl NavigationInputs {
    fn from_params(params: &RequestParameters) -> Self {
        Self {
            target_id: params.target_id.clone(),
            release: params.release.clone(),
            files: params.explicit_files.clone().unwrap_or_default(),
        }
    }

    pub fn to_params(&self) -> RequestParameters {
        let files = self.files.trim();
        RequestParameters::new(
            &self.target_id,
            &self.release,
            (!files.is_empty()).then_some(files),
        )
    }
}

/// The full UI state, independent of rendering.
///
/// Only the UI thread mutates it; resolutions run on worker threads and come
/// back through a channel drained in [`AppState::poll`].
pub struct AppState {
    pub settings: Settings,
    pub params: RequestParameters,
    pub selection: SelectionState,
    pub session: SpecvizSession,
    pub nav: NavigationInputs,

    lookup: Arc<dyn TargetLookup + Send + Sync>,
    locator: Option<SasAccess>,
    tx: Sender<Resolution>,
    rx: Receiver<Resolution>,

    /// Theme requested by the last navigation, applied by the app once.
    pub pending_theme: Option<Theme>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(settings: Settings, params: RequestParameters) -> Self {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let lookup: Arc<dyn TargetLookup + Send + Sync> = match ValisClient::new(&settings.api_url, timeout) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                log::error!("Cannot create lookup client for {}: {e}", settings.api_url);
                Arc::new(Unavailable(e.to_string()))
            }
        };
        Self::with_lookup(settings, params, lookup)
    }

    pub fn with_lookup(
        settings: Settings,
        params: RequestParameters,
        lookup: Arc<dyn TargetLookup + Send + Sync>,
    ) -> Self {
        let locator = match SasAccess::new(
            settings.access_mode,
            &settings.sas_remote_url,
            &settings.sas_base_dir,
        ) {
            Ok(access) => Some(access),
            Err(e) => {
                log::error!("Invalid archive URL '{}': {e}", settings.sas_remote_url);
                None
            }
        };
        let (tx, rx) = mpsc::channel();

        Self {
            settings,
            selection: SelectionState::new(params.generation),
            nav: NavigationInputs::from_params(&params),
            pending_theme: params.theme,
            params,
            session: SpecvizSession::new(),
            lookup,
            locator,
            tx,
            rx,
            status_message: None,
        }
    }

    /// Start over with new navigation parameters.
    pub fn navigate(&mut self, params: RequestParameters) {
        log::info!("Navigating to '{}'", params.to_search());
        self.selection = SelectionState::new(params.generation);
        self.session = SpecvizSession::new();
        self.nav = NavigationInputs::from_params(&params);
        if params.theme.is_some() {
            self.pending_theme = params.theme;
        }
        self.params = params;
        self.status_message = None;
    }

    /// Drain finished resolutions and start a new one when due.
    pub fn poll(&mut self, now: Instant) {
        while let Ok(res) = self.rx.try_recv() {
            let was_empty = self.selection.files().is_empty();
            if !self.selection.commit(res.generation, res.files) {
                continue;
            }
            if self.selection.files().is_empty() {
                self.status_message = Some("No spectral files found".to_string());
            } else if was_empty {
                self.status_message = None;
                let report = coordinator::load_initial(self.selection.files(), &mut self.session);
                self.report_failures(&report);
            }
        }

        let retry = Duration::from_secs(self.settings.retry_interval_secs);
        if self.selection.needs_resolution(&self.params, now, retry) {
            self.selection.begin(now);
            let params = self.params.clone();
            let lookup = Arc::clone(&self.lookup);
            let tx = self.tx.clone();
            std::thread::spawn(move || {
                let files = resolve(&params, lookup.as_ref());
                // The receiver is gone only when the app is shutting down.
                let _ = tx.send(Resolution {
                    generation: params.generation,
                    files,
                });
            });
        }
    }

    fn report_failures(&mut self, report: &LoadReport) {
        if let Some((label, err)) = report.failed.first() {
            self.status_message = Some(format!("Error loading {label}: {err}"));
        }
    }

    /// Load the selected files into the viewer.
    pub fn load_selected(&mut self) -> LoadReport {
        let selected = self.selection.selected_labels().to_vec();
        let report = coordinator::load_selected(&selected, self.selection.files(), &mut self.session);
        self.status_message = Some(report.summary());
        self.report_failures(&report);
        report
    }

    /// Build the reproduction notebook for the current files.
    pub fn notebook(&self) -> Option<ReproductionScript> {
        let locator = self.locator.as_ref()?;
        Some(export::export(
            self.selection.files(),
            &self.params.release,
            &self.params.target_id,
            locator,
        ))
    }
}
