//! Core gateway logic: catalog, token estimation, cost accounting,
//! provider adapters and request routing.

pub mod catalog;
pub mod cost;
pub mod providers;
pub mod router;
pub mod tokenizer;
pub mod types;
