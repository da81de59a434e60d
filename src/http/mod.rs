//! HTTP API for the upload and processing flow:
//! - POST /upload/chunk - Submit one chunk of a session's file
//! - POST /process - Run the media pipeline on a reassembled file
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
