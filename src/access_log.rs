//! Per-request access logging.
//!
//! Every dispatched command is recorded with its source IP, command
//! keyword, final status, and a short note (path, message, or failure
//! reason). Emitted as structured tracing events so the sink is whatever
//! subscriber the process installed.

use std::net::IpAddr;

pub fn record(ip: IpAddr, method: &str, status: u16, note: &str) {
    tracing::info!(target: "access", ip = %ip, method, status, note, "request");
}
