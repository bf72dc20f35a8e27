//! Storage infrastructure: configuration file persistence.
//!
//! The server keeps no state across restarts except its configuration, which
//! lives in a TOML file in the platform config directory.  See [`config`].

pub mod config;
