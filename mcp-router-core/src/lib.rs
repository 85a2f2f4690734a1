//! Routing engine for the MCP router: downstream client sessions, the
//! instance registry, the config store, and the upstream server façade.

pub mod config_model;
pub mod config_store;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod transport;
pub mod validate;
pub mod watcher;

pub use error::{Result, RouterError};
