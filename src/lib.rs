//! Client-side sync core for a remote code-ingestion service.
//!
//! Keeps the server's view of a local source folder consistent with the
//! on-disk state: a content-addressed Merkle tree is rebuilt on workspace
//! open, diffed against the server's copy, and only the contents the server
//! asks for go over the wire. A chat-session gateway on top gates its own
//! availability on the project's ingestion status.

pub mod api;
pub mod chat;
pub mod cmd;
pub mod config;
pub mod error;
pub mod file;
pub mod hash;
pub mod identity;
pub mod merkle;
pub mod sync;

pub use error::{Error, Result};
