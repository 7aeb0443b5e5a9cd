use std::sync::Arc;

use crate::session::Recorder;
use crate::upload::Uploader;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub recorder: Arc<Recorder>,
    pub uploader: Arc<dyn Uploader>,
    /// Used when a submit request does not say whether to convert
    pub convert_to_mp3: bool,
}

impl AppState {
    pub fn new(recorder: Arc<Recorder>, uploader: Arc<dyn Uploader>, convert_to_mp3: bool) -> Self {
        Self {
            recorder,
            uploader,
            convert_to_mp3,
        }
    }
}
