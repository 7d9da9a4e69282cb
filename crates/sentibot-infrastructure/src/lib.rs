//! Filesystem adapters for SentiBOT: paths, configuration and session files.

pub mod config_service;
pub mod json_session_store;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_session_store::JsonSessionStore;
pub use crate::paths::SentibotPaths;
