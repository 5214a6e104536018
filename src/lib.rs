//! filedrop - Text-prefixed file transfer server
//!
//! Core library for the command protocol, rate limiting, and sandboxed
//! file operations.

pub mod access_log;
pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod protocol;
pub mod sandbox;
pub mod server;
pub mod storage;
