//! Tracking decision engine

use crate::context::RequestContext;
use crate::parameters::{self, ParameterSet};
use crate::settings::TrackingSettings;
use crate::snippet;
use crate::store::SettingsSource;
use crate::visibility::{self, PathMatcher};
use log::debug;

/// Decides whether a page is tracked and renders the snippet for it.
///
/// Holds one immutable settings snapshot, with its visibility list compiled
/// once; every operation is a pure function of that snapshot and the
/// request context.
///
/// # Example
///
/// ```
/// use beacon_core::{RequestContext, TrackingDecisionEngine, TrackingSettings};
///
/// let settings = TrackingSettings {
///     account: "UA-123456-2".to_string(),
///     anonymize_ip: false,
///     ..TrackingSettings::default()
/// };
/// let engine = TrackingDecisionEngine::new(settings);
/// let ctx = RequestContext::new("/");
///
/// assert!(engine.should_track(&ctx));
/// assert_eq!(engine.build_tracking_parameters(&ctx).to_string(), r#"{"groups":"default"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct TrackingDecisionEngine {
    settings: TrackingSettings,
    paths: Option<PathMatcher>,
}

impl TrackingDecisionEngine {
    pub fn new(settings: TrackingSettings) -> Self {
        let paths = PathMatcher::from_settings(&settings);
        Self { settings, paths }
    }

    /// Snapshot the settings held by `source`
    pub fn from_source<S: SettingsSource + ?Sized>(source: &S) -> Self {
        Self::new(TrackingSettings::from_source(source))
    }

    pub fn settings(&self) -> &TrackingSettings {
        &self.settings
    }

    pub fn should_track(&self, context: &RequestContext) -> bool {
        visibility::should_track_with(&self.settings, self.paths.as_ref(), context)
    }

    /// Parameters of the `config` call. Only meaningful when [`Self::should_track`] holds.
    pub fn build_tracking_parameters(&self, context: &RequestContext) -> ParameterSet {
        parameters::build_tracking_parameters(&self.settings, context)
    }

    /// Markup for the page-render hook, `None` when the page is not tracked.
    pub fn render(&self, context: &RequestContext) -> Option<String> {
        if !self.should_track(context) {
            debug!("Tracking skipped for '{}'", context.current_path);
            return None;
        }

        let parameters = self.build_tracking_parameters(context);
        Some(snippet::render(&self.settings, context, &parameters))
    }
}
