//! Infrastructure layer for the server.
//!
//! Contains OS- and socket-facing adapters.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `padmouse_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.
//!
//! # Sub-modules
//!
//! - **`cursor_sink`** – `CursorSink` adapters: the mutual-exclusion wrapper
//!   shared by all sessions, a logging sink, and a recording sink for tests.
//!
//! - **`network`** – TCP accept loop, session registry and admission, and
//!   the per-connection read task.
//!
//! - **`status`** – Server status snapshots published on a watch channel.
//!
//! - **`storage`** – TOML configuration file.

pub mod cursor_sink;
pub mod network;
pub mod status;
pub mod storage;
