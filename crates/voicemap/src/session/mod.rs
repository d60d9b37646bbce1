//! Interactive search state: debounced input, the suggestion list, the
//! selected place, and the commands sent to the map.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, instrument, trace};
use voicemap_data_processing::Coordinate;

use crate::backend::RegionFetcher;
use crate::config::SessionConfig;
use crate::geocoder::Geocoder;
use crate::search::{PlaceResolver, Suggestion, SuggestionKind, ViewportCommand};

/// The map a session drives. Rendering is entirely up to the implementor.
pub trait MapSurface {
    /// Moves the camera for a chosen suggestion.
    fn show(&mut self, command: &ViewportCommand);
    fn highlight_constituency(&mut self, name: &str);
    fn clear_highlight(&mut self);
    fn fly_to(&mut self, center: Coordinate, zoom: f64);
}

/// What the user last picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedPlace {
    pub name: String,
    pub kind: SuggestionKind,
}

/// One search box bound to a resolver.
///
/// Inputs are debounced and last-query-wins: each input takes a new
/// generation, and a resolution is only published if no newer input arrived
/// while it slept or ran.
///
/// The banner reflects the resolver's current load: dismissing it hides it
/// for that load only, so a retry that fails again shows it again.
#[derive(Debug)]
pub struct SearchSession<G, F> {
    resolver: Arc<PlaceResolver<G, F>>,
    config: SessionConfig,
    generation: AtomicU64,
    loading: AtomicBool,
    resolutions: AtomicUsize,
    suggestions: Mutex<Vec<Suggestion>>,
    selected: Mutex<Option<SelectedPlace>>,
    dismissed_load: Mutex<Option<u64>>,
}

impl<G: Geocoder, F: RegionFetcher> SearchSession<G, F> {
    pub fn new(resolver: Arc<PlaceResolver<G, F>>, config: SessionConfig) -> Self {
        Self {
            resolver,
            config,
            generation: AtomicU64::new(0),
            loading: AtomicBool::new(false),
            resolutions: AtomicUsize::new(0),
            suggestions: Mutex::new(Vec::new()),
            selected: Mutex::new(None),
            dismissed_load: Mutex::new(None),
        }
    }

    /// Handles one input change. Returns whether this input's suggestions
    /// were published; `false` means it was empty or superseded.
    #[instrument(name = "Search input", skip(self), level = "debug")]
    pub async fn on_input(&self, query: &str) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if query.trim().is_empty() {
            self.set_suggestions(Vec::new());
            self.loading.store(false, Ordering::SeqCst);
            return false;
        }

        tokio::time::sleep(self.config.debounce).await;
        if self.is_superseded(generation) {
            trace!(generation, "Input superseded while debouncing");
            return false;
        }

        self.loading.store(true, Ordering::SeqCst);
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        let suggestions = self.resolver.resolve(query).await;

        if self.is_superseded(generation) {
            debug!(generation, "Discarding superseded suggestions");
            return false;
        }
        self.set_suggestions(suggestions);
        self.loading.store(false, Ordering::SeqCst);
        true
    }

    /// Emits the command for `suggestion` to `surface` and records the
    /// selection. Constituencies are also highlighted.
    #[instrument(name = "Select suggestion", skip_all, fields(id = %suggestion.id), level = "debug")]
    pub async fn select<M: MapSurface>(&self, suggestion: &Suggestion, surface: &mut M) -> ViewportCommand {
        let command = self.resolver.command_for(suggestion).await;
        if let Ok(mut selected) = self.selected.lock() {
            *selected = Some(SelectedPlace {
                name: command.name.clone(),
                kind: command.kind,
            });
        }
        if command.kind == SuggestionKind::Constituency {
            surface.highlight_constituency(&command.name);
        }
        surface.show(&command);
        self.set_suggestions(Vec::new());
        command
    }

    /// Clears the selection and returns the map to the home view.
    pub fn reset<M: MapSurface>(&self, surface: &mut M) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut selected) = self.selected.lock() {
            *selected = None;
        }
        self.set_suggestions(Vec::new());
        self.loading.store(false, Ordering::SeqCst);
        surface.clear_highlight();
        surface.fly_to(self.config.home_center, self.config.home_zoom);
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn set_suggestions(&self, suggestions: Vec<Suggestion>) {
        if let Ok(mut current) = self.suggestions.lock() {
            *current = suggestions;
        }
    }
}

impl<G, F> SearchSession<G, F> {
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.suggestions.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn selected(&self) -> Option<SelectedPlace> {
        self.selected.lock().ok().and_then(|s| s.clone())
    }

    /// Number of inputs that survived the debounce and were resolved.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }

    /// Dataset load problems of the current load, unless dismissed.
    pub fn banner(&self) -> Option<String> {
        let indexes = self.resolver.indexes();
        let dismissed = self.dismissed_load.lock().ok().and_then(|load| *load);
        if dismissed == Some(indexes.load) {
            return None;
        }
        indexes.report.banner_message()
    }

    pub fn dismiss_banner(&self) {
        let load = self.resolver.indexes().load;
        if let Ok(mut dismissed) = self.dismissed_load.lock() {
            *dismissed = Some(load);
        }
    }

    pub fn resolver(&self) -> &PlaceResolver<G, F> {
        &self.resolver
    }
}
