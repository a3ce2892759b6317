//! HTTP server

pub mod builder;
pub mod routes;
pub mod state;

pub use builder::{build_state, json_config, run_server};
pub use state::AppState;
