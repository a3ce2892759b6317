//! tollgate: an OpenAI-compatible gateway in front of multiple LLM providers
//!
//! Requests arrive in one unified schema, are routed to the provider that
//! serves the requested model, and leave behind one activity log record with
//! token counts and cost, whether they complete, fail, time out or get
//! cancelled mid-stream.

pub mod config;
pub mod core;
pub mod server;
pub mod storage;
pub mod utils;
