use std::collections::HashMap;

/// Method of a path-bearing transfer command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMethod {
    /// GET - Download a file from the serve root
    Get,
    /// POST - Upload a file into the storage root
    Post,
    /// DELETE - Remove a file from the storage root
    Delete,
}

/// A parsed, complete unit of work.
///
/// Constructed only once the full bytes for the variant are buffered;
/// never partially dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `COMM <text>` - free-text message
    Chat { text: String },
    /// `GET_INFO` - caller's connection statistics
    Info,
    /// `GET_LIST` - storage-root directory listing
    List,
    /// `GET`/`POST`/`DELETE <path>` - file transfer operation
    Transfer {
        method: TransferMethod,
        path: String,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    },
}

impl Command {
    /// The wire keyword, used for access logging.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Chat { .. } => "COMM",
            Command::Info => "GET_INFO",
            Command::List => "GET_LIST",
            Command::Transfer { method, .. } => match method {
                TransferMethod::Get => "GET",
                TransferMethod::Post => "POST",
                TransferMethod::Delete => "DELETE",
            },
        }
    }
}
