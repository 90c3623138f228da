//! Bridges Figma comment webhooks into Matrix rooms.
//!
//! Each tracked Figma file is bound to a room through persisted room state;
//! incoming comment webhooks are deduplicated by a staleness window, routed
//! by file id, and relayed as formatted notices with reply threading against
//! previously relayed comments.

pub mod bootstrap;
pub mod chat;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod invites;
pub mod payload;
pub mod room;
pub mod router;
pub mod server;

pub use error::{Error, Result};
