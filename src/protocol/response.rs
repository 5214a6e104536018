/// Status codes used in reply envelopes.
///
/// - `Ok` (200): Command succeeded
/// - `BadRequest` (400): Malformed command or framing
/// - `Forbidden` (403): Sandbox violation
/// - `NotFound` (404): Missing file, directory, or statistics
/// - `MethodNotAllowed` (405): Unknown command keyword
/// - `RequestTimeout` (408): Connection idle too long
/// - `TooManyRequests` (429): Rate limit exceeded
/// - `InternalServerError` (500): Filesystem or I/O failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 408 Request Timeout
    RequestTimeout,
    /// 429 Too Many Requests
    TooManyRequests,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use filedrop::protocol::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::TooManyRequests.as_u16(), 429);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::RequestTimeout => 408,
            StatusCode::TooManyRequests => 429,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::TooManyRequests => "Too Many Requests",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// An HTTP-style reply envelope.
///
/// Headers keep insertion order so the serialized envelope is
/// deterministic: caller headers first (Content-Type defaulting to
/// text/plain), then Content-Length and Connection: close.
#[derive(Debug)]
pub struct Response {
    /// The status code
    pub status: StatusCode,
    /// Headers in serialization order
    pub headers: Vec<(String, String)>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing reply envelopes in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/octet-stream")
///     .body(data)
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Appends a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Inserts a text/plain Content-Type if none was given and appends
    /// Content-Length and Connection: close.
    pub fn build(mut self) -> Response {
        if !self
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("Content-Type"))
        {
            self.headers
                .insert(0, ("Content-Type".to_string(), "text/plain".to_string()));
        }

        self.headers
            .push(("Content-Length".to_string(), self.body.len().to_string()));
        self.headers
            .push(("Connection".to_string(), "close".to_string()));

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a plain-text envelope carrying a status message body.
    pub fn status_line(status: StatusCode, message: &str) -> Self {
        ResponseBuilder::new(status)
            .body(message.as_bytes().to_vec())
            .build()
    }
}

/// The bytes a dispatched command answers with.
#[derive(Debug)]
pub enum ReplyBody {
    /// Written verbatim: COMM acknowledgements and the GET_INFO block
    Raw(Vec<u8>),
    /// An HTTP-style envelope
    Http(Response),
}

/// A reply plus whether the connection closes after writing it.
#[derive(Debug)]
pub struct Reply {
    pub body: ReplyBody,
    pub close: bool,
}

impl Reply {
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            body: ReplyBody::Raw(bytes.into()),
            close: false,
        }
    }

    pub fn http(response: Response) -> Self {
        Self {
            body: ReplyBody::Http(response),
            close: false,
        }
    }

    pub fn and_close(mut self) -> Self {
        self.close = true;
        self
    }
}
