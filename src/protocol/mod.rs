//! Command protocol implementation.
//!
//! Implements the text-prefixed command protocol spoken over raw TCP.
//!
//! # Architecture
//!
//! - **`framing`**: Reassembles the inbound byte stream into complete
//!   commands, handling partial reads and length-delimited `POST` bodies
//! - **`command`**: The parsed command variants
//! - **`dispatch`**: Maps completed commands to actions behind the rate
//!   limiter and the path sandboxes
//! - **`response`**: Reply representation (raw lines and HTTP-style
//!   envelopes) with a builder
//! - **`writer`**: Serializes and writes replies to the client
//! - **`connection`**: The per-connection driver tying the above together
//!
//! # Connection state machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingCommand  │ ← Buffer until a full command line arrives
//!        └──────┬───────────┘
//!               │ POST keyword seen
//!               ▼
//!        ┌───────────────────┐
//!        │ AwaitingBodyLength│ ← Scan for the header/body delimiter,
//!        └──────┬────────────┘   extract Content-Length
//!               │ Delimiter found
//!               ▼
//!        ┌──────────────────┐
//!        │ AwaitingBodyBytes│ ← Buffer until the declared body length
//!        └──────┬───────────┘
//!               │ Frame complete
//!               └─ dispatch → reply → back to AwaitingCommand
//! ```
//!
//! Surplus bytes after a completed frame belong to the next command and
//! are retained in the connection buffer.

pub mod command;
pub mod connection;
pub mod dispatch;
pub mod framing;
pub mod response;
pub mod writer;

pub use command::{Command, TransferMethod};
pub use dispatch::Dispatcher;
pub use framing::{Frame, FrameError, Reassembler};
pub use response::{Reply, ReplyBody, Response, StatusCode};
