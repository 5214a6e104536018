use std::collections::HashMap;
use thiserror::Error;

use crate::protocol::command::{Command, TransferMethod};

/// Cap on the buffered region before a line terminator or the POST
/// header/body delimiter, to prevent unbounded growth.
const MAX_PREFIX_BYTES: usize = 64 * 1024;

const HEADER_DELIMITER: &[u8] = b"\r\n\r\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing Content-Length header")]
    MissingContentLength,

    #[error("invalid Content-Length header")]
    InvalidContentLength,

    #[error("command line too long")]
    LineTooLong,

    #[error("header block too large")]
    HeadersTooLarge,

    #[error("command line is not valid UTF-8")]
    InvalidUtf8,
}

/// A completed command plus the exact number of buffer bytes it spans
/// (including any skipped blank lines before it). The connection drains
/// only `consumed`; surplus bytes belong to the next command.
#[derive(Debug)]
pub struct Frame {
    pub command: Command,
    pub consumed: usize,
}

#[derive(Debug)]
enum FramingState {
    AwaitingCommand,
    AwaitingBodyLength {
        /// Offset of the POST line in the buffer
        start: usize,
    },
    AwaitingBodyBytes {
        header_end: usize,
        body_len: usize,
        path: String,
        headers: HashMap<String, String>,
    },
}

/// Per-connection incremental command reassembler.
///
/// `advance` inspects the connection buffer and either produces a
/// complete [`Frame`], reports that more bytes are needed, or fails with
/// a framing error. Classification happens only once a full line is
/// buffered, so commands fragmented across TCP segments are handled the
/// same as single-write ones.
#[derive(Debug)]
pub struct Reassembler {
    state: FramingState,
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            state: FramingState::AwaitingCommand,
        }
    }

    /// True when a POST header has been parsed and the declared body is
    /// still outstanding. Used to classify truncation at end-of-stream.
    pub fn awaiting_body(&self) -> bool {
        matches!(self.state, FramingState::AwaitingBodyBytes { .. })
    }

    pub fn advance(&mut self, buf: &[u8]) -> Result<Option<Frame>, FrameError> {
        loop {
            match &self.state {
                FramingState::AwaitingCommand => match self.scan_command(buf)? {
                    Scan::Frame(frame) => return Ok(Some(frame)),
                    Scan::NeedMore => return Ok(None),
                    Scan::Continue => {}
                },

                FramingState::AwaitingBodyLength { start } => {
                    let start = *start;
                    match find_delimiter(&buf[start..]) {
                        None => {
                            if buf.len() - start > MAX_PREFIX_BYTES {
                                return Err(FrameError::HeadersTooLarge);
                            }
                            return Ok(None);
                        }
                        Some(rel) => {
                            let header_end = start + rel;
                            let (path, headers, body_len) =
                                parse_post_headers(&buf[start..header_end])?;
                            self.state = FramingState::AwaitingBodyBytes {
                                header_end,
                                body_len,
                                path,
                                headers,
                            };
                        }
                    }
                }

                FramingState::AwaitingBodyBytes {
                    header_end,
                    body_len,
                    ..
                } => {
                    let body_start = header_end + HEADER_DELIMITER.len();
                    // Client-controlled length: checked, so a huge value
                    // cannot wrap past the length test below.
                    let needed = body_start
                        .checked_add(*body_len)
                        .ok_or(FrameError::InvalidContentLength)?;
                    if buf.len() < needed {
                        return Ok(None);
                    }

                    let state =
                        std::mem::replace(&mut self.state, FramingState::AwaitingCommand);
                    let FramingState::AwaitingBodyBytes {
                        body_len, path, headers, ..
                    } = state
                    else {
                        unreachable!();
                    };

                    let body = buf[body_start..body_start + body_len].to_vec();
                    return Ok(Some(Frame {
                        command: Command::Transfer {
                            method: TransferMethod::Post,
                            path,
                            headers,
                            body,
                        },
                        consumed: needed,
                    }));
                }
            }
        }
    }

    /// Scans for the next non-blank command line and classifies it.
    fn scan_command(&mut self, buf: &[u8]) -> Result<Scan, FrameError> {
        let mut start = 0;

        loop {
            let Some(rel) = buf[start..].iter().position(|&b| b == b'\n') else {
                if buf.len() - start > MAX_PREFIX_BYTES {
                    return Err(FrameError::LineTooLong);
                }
                return Ok(Scan::NeedMore);
            };

            let mut line = &buf[start..start + rel];
            if line.ends_with(b"\r") {
                line = &line[..line.len() - 1];
            }
            let end = start + rel + 1;

            let line = std::str::from_utf8(line).map_err(|_| FrameError::InvalidUtf8)?;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                start = end;
                continue;
            }

            let mut tokens = trimmed.split_whitespace();
            let keyword = tokens.next().unwrap_or_default();

            let command = match keyword {
                "COMM" => Command::Chat {
                    text: trimmed
                        .strip_prefix("COMM")
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                },
                "GET_INFO" => Command::Info,
                "GET_LIST" => Command::List,
                "GET" => transfer(TransferMethod::Get, tokens.next()),
                "DELETE" => transfer(TransferMethod::Delete, tokens.next()),
                "POST" => {
                    // Length-delimited: the frame extends past this line.
                    self.state = FramingState::AwaitingBodyLength { start };
                    return Ok(Scan::Continue);
                }
                other => return Err(FrameError::UnknownCommand(other.to_string())),
            };

            return Ok(Scan::Frame(Frame {
                command,
                consumed: end,
            }));
        }
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

enum Scan {
    Frame(Frame),
    NeedMore,
    Continue,
}

fn transfer(method: TransferMethod, path: Option<&str>) -> Command {
    Command::Transfer {
        method,
        path: path.unwrap_or_default().to_string(),
        headers: HashMap::new(),
        body: Vec::new(),
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_DELIMITER.len())
        .position(|w| w == HEADER_DELIMITER)
}

/// Parses the `POST <path>` request line and the header block above the
/// delimiter. Only Content-Length is interpreted (case-insensitive);
/// other headers are carried opaquely.
fn parse_post_headers(
    header_bytes: &[u8],
) -> Result<(String, HashMap<String, String>, usize), FrameError> {
    let header_str =
        std::str::from_utf8(header_bytes).map_err(|_| FrameError::InvalidUtf8)?;

    let mut lines = header_str.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let body_len = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .ok_or(FrameError::MissingContentLength)?
        .1
        .parse::<usize>()
        .map_err(|_| FrameError::InvalidContentLength)?;

    Ok((path, headers, body_len))
}
