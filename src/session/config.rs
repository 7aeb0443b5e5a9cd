use std::sync::Arc;

use super::channel::ActiveChannel;
use crate::audio::format::DEFAULT_MIME_PREFERENCES;
use crate::audio::{AudioSink, CaptureBackend, CaptureConstraints, HandleRegistry};

/// Capture settings shared by both channels
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Constraints passed to the capture backend on every start
    pub constraints: CaptureConstraints,

    /// Container types in preference order; the first the backend
    /// supports is used
    pub mime_preferences: Vec<String>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            mime_preferences: DEFAULT_MIME_PREFERENCES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Everything a session borrows from the recorder that owns it
#[derive(Clone)]
pub struct SessionContext {
    pub backend: Arc<dyn CaptureBackend>,
    pub sink: Arc<dyn AudioSink>,
    pub handles: HandleRegistry,
    pub active: ActiveChannel,
    pub settings: CaptureSettings,
}
