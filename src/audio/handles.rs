// Playable handle registry
//
// Each finished artifact gets one opaque handle (a `blob:` style URL) that
// renderers resolve to the artifact. Revoking a handle makes it
// unresolvable; sessions revoke theirs on clear and on teardown.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::artifact::AudioArtifact;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlaybackHandle(String);

impl PlaybackHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared registry of live playable handles
#[derive(Clone, Default)]
pub struct HandleRegistry {
    entries: Arc<Mutex<HashMap<PlaybackHandle, AudioArtifact>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new handle for an artifact
    pub fn issue(&self, artifact: AudioArtifact) -> PlaybackHandle {
        let handle = PlaybackHandle(format!("blob:loqa/{}", Uuid::new_v4()));
        debug!("Issued playable handle {} ({} bytes)", handle, artifact.len());
        self.entries().insert(handle.clone(), artifact);
        handle
    }

    pub fn resolve(&self, handle: &PlaybackHandle) -> Option<AudioArtifact> {
        self.entries().get(handle).cloned()
    }

    /// Revoke a handle; returns false if it was already gone
    pub fn revoke(&self, handle: &PlaybackHandle) -> bool {
        let removed = self.entries().remove(handle).is_some();
        if removed {
            debug!("Revoked playable handle {}", handle);
        }
        removed
    }

    /// Number of handles that are still resolvable
    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    // A poisoned map is still structurally valid
    fn entries(&self) -> MutexGuard<'_, HashMap<PlaybackHandle, AudioArtifact>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
