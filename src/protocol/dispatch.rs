use std::net::IpAddr;
use std::sync::Arc;

use crate::access_log;
use crate::clock::format_timestamp;
use crate::error::ProtocolError;
use crate::limiter::RateLimiter;
use crate::protocol::command::{Command, TransferMethod};
use crate::protocol::response::{Reply, Response, ResponseBuilder, StatusCode};
use crate::sandbox::{Sandbox, SandboxError};
use crate::storage::{self, FsError};

/// Maps completed commands to actions.
///
/// Every branch is preceded by a rate-limiter admission check keyed on
/// the connection's source IP; rejection short-circuits with 429 and the
/// connection closes without invoking the handler. Path-bearing commands
/// go through a sandbox before any filesystem access: GET reads from the
/// serve root and mirrors into the storage root, POST and DELETE operate
/// on the storage root.
pub struct Dispatcher {
    limiter: Arc<RateLimiter>,
    serve: Sandbox,
    storage: Sandbox,
}

impl Dispatcher {
    pub fn new(limiter: Arc<RateLimiter>, serve: Sandbox, storage: Sandbox) -> Self {
        Self {
            limiter,
            serve,
            storage,
        }
    }

    pub async fn dispatch(&self, command: Command, peer: IpAddr) -> Reply {
        let label = command.label();

        if !self.limiter.admit(peer).await {
            access_log::record(peer, label, 429, "rate limited");
            return Reply::http(Response::status_line(
                StatusCode::TooManyRequests,
                "Too Many Requests",
            ))
            .and_close();
        }

        let result = match command {
            Command::Chat { text } => Ok(self.handle_chat(peer, &text)),
            Command::Info => self.handle_info(peer).await,
            Command::List => self.handle_list(peer).await,
            Command::Transfer { method, path, body, .. } => match method {
                TransferMethod::Get => self.handle_get(peer, &path).await,
                TransferMethod::Post => self.handle_post(peer, &path, &body).await,
                TransferMethod::Delete => self.handle_delete(peer, &path).await,
            },
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                let status = e.status();
                access_log::record(peer, label, status.as_u16(), &e.to_string());
                Reply::http(Response::status_line(status, &e.to_string()))
            }
        }
    }

    /// `COMM <text>` answers with a bare status line, no envelope.
    fn handle_chat(&self, peer: IpAddr, text: &str) -> Reply {
        if text.trim().is_empty() {
            access_log::record(peer, "COMM", 400, "empty message");
            return Reply::raw("400 Message cannot be empty\r\n");
        }

        access_log::record(peer, "COMM", 200, text);
        Reply::raw(format!("200 Server received: {}\r\n", text))
    }

    /// `GET_INFO` answers with a raw plaintext statistics block.
    async fn handle_info(&self, peer: IpAddr) -> Result<Reply, ProtocolError> {
        let stats = self.limiter.stats(peer).await.ok_or_else(|| {
            ProtocolError::NotFound("No statistics recorded for this address".to_string())
        })?;

        let block = format!(
            "IP Address: {}\nFirst Seen: {}\nTotal Requests: {}\nLast Request: {}\nCurrent Window Requests: {}\n",
            stats.ip,
            format_timestamp(stats.first_seen),
            stats.total_requests,
            format_timestamp(stats.last_request),
            stats.current_window_requests,
        );

        access_log::record(peer, "GET_INFO", 200, "stats");
        Ok(Reply::raw(block))
    }

    async fn handle_list(&self, peer: IpAddr) -> Result<Reply, ProtocolError> {
        let entries = match storage::enumerate(self.storage.root()).await {
            Ok(entries) => entries,
            Err(FsError::NotFound) => {
                return Err(ProtocolError::NotFound("Server directory not found".to_string()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read storage directory");
                return Err(ProtocolError::IoFailure("Error reading directory".to_string()));
            }
        };

        if entries.is_empty() {
            return Err(ProtocolError::NotFound(
                "No files found in the server folder".to_string(),
            ));
        }

        let listing = storage::format_file_listing(&entries);
        access_log::record(peer, "GET_LIST", 200, "listing");
        Ok(Reply::http(Response::status_line(StatusCode::Ok, &listing)))
    }

    async fn handle_get(&self, peer: IpAddr, path: &str) -> Result<Reply, ProtocolError> {
        if path.is_empty() {
            return Err(ProtocolError::MalformedCommand("Path is required".to_string()));
        }

        let source = self.serve.resolve_existing(path).map_err(|e| match e {
            SandboxError::NotFound => {
                ProtocolError::NotFound("Source file not found".to_string())
            }
            SandboxError::Escape => ProtocolError::PathEscape,
        })?;

        let data = storage::read_file(&source).await.map_err(|e| match e {
            FsError::NotFound => ProtocolError::NotFound("Source file not found".to_string()),
            other => {
                tracing::warn!(path, error = %other, "failed to read source file");
                ProtocolError::IoFailure("Error reading file".to_string())
            }
        })?;

        // Mirroring side effect; the reply is the file either way.
        match self.storage.resolve_for_write(path) {
            Ok(target) => {
                if let Err(e) = storage::write_file(&target, &data).await {
                    tracing::warn!(path, error = %e, "failed to mirror file into storage root");
                }
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "mirror target rejected by sandbox");
            }
        }

        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let response = ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", "application/octet-stream")
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            )
            .body(data)
            .build();

        access_log::record(peer, "GET", 200, path);
        Ok(Reply::http(response))
    }

    async fn handle_post(
        &self,
        peer: IpAddr,
        path: &str,
        body: &[u8],
    ) -> Result<Reply, ProtocolError> {
        if path.is_empty() {
            return Err(ProtocolError::MalformedCommand("Path is required".to_string()));
        }

        let target = self.storage.resolve_for_write(path).map_err(|e| match e {
            SandboxError::Escape => ProtocolError::PathEscape,
            SandboxError::NotFound => {
                ProtocolError::NotFound(format!("File {} not found", path.trim_start_matches('/')))
            }
        })?;

        storage::write_file(&target, body).await.map_err(|e| {
            tracing::warn!(path, error = %e, "failed to save uploaded file");
            ProtocolError::IoFailure("Error saving file".to_string())
        })?;

        access_log::record(peer, "POST", 200, path);
        Ok(Reply::http(Response::status_line(
            StatusCode::Ok,
            &format!("File successfully saved to {}", target.display()),
        )))
    }

    async fn handle_delete(&self, peer: IpAddr, path: &str) -> Result<Reply, ProtocolError> {
        if path.is_empty() {
            return Err(ProtocolError::MalformedCommand("Path is required".to_string()));
        }

        let clean = path.trim_start_matches('/');

        let target = self.storage.resolve_existing(path).map_err(|e| match e {
            SandboxError::NotFound => {
                ProtocolError::NotFound(format!("File {} not found", clean))
            }
            SandboxError::Escape => ProtocolError::PathEscape,
        })?;

        storage::delete_file(&target).await.map_err(|e| match e {
            FsError::NotFound => ProtocolError::NotFound(format!("File {} not found", clean)),
            FsError::NotAFile => {
                ProtocolError::MalformedCommand("Cannot delete: Not a file".to_string())
            }
            other => {
                tracing::warn!(path, error = %other, "failed to delete file");
                ProtocolError::IoFailure("Error deleting file".to_string())
            }
        })?;

        access_log::record(peer, "DELETE", 200, path);
        Ok(Reply::http(Response::status_line(
            StatusCode::Ok,
            &format!("File {} deleted successfully", clean),
        )))
    }
}
