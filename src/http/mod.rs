//! HTTP API hosting the story wizard
//!
//! This module provides a REST API for a front end driving the wizard:
//! - GET /wizard - Persisted progress
//! - POST /wizard/consent, POST /wizard/details - Steps one and two
//! - POST /recording/{start,pause,resume,stop,rerecord,submit} - Session control
//! - GET /recording, GET /recording/artifact - Status and review playback
//! - GET /recording/leave-guard - Whether leaving would lose work
//! - DELETE /recording - Tear the session down
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
