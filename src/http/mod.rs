//! HTTP control API for the recorder
//!
//! - GET /health - Health check
//! - GET /recordings - Both channels plus the pending import
//! - GET /recordings/:channel - One channel's snapshot
//! - GET /recordings/:channel/artifact - Finished artifact bytes
//! - POST /recordings/:channel/{start,pause,resume,stop,clear,playback}
//! - POST /recordings/submit - Upload finished recordings
//! - POST /imports?name=<file> - Select an audio file for upload
//! - DELETE /imports - Discard the selected file
//! - POST /imports/submit - Upload the selected file

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, SubmitRequest};
pub use routes::create_router;
pub use state::AppState;
