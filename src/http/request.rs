use std::fmt;

use crate::http::headers::HttpHeaders;

pub const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// First line of a request, e.g. `GET /index.html HTTP/1.1`.
///
/// `version` holds the part after `HTTP/` and is always `"1.1"` once parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: String,
}

/// Progress of the request parser. `Done` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Init,
    Header,
    Body,
    Done,
    Error,
}

impl ParserState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ParserState::Done | ParserState::Error)
    }
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserState::Init => "init",
            ParserState::Header => "header",
            ParserState::Body => "body",
            ParserState::Done => "done",
            ParserState::Error => "error",
        };
        f.write_str(name)
    }
}

/// A request being parsed, or fully parsed once its state is `Done`.
///
/// The parsing logic lives in [`parser`](crate::http::parser).
#[derive(Debug)]
pub struct HttpRequest {
    pub line: RequestLine,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,

    pub(crate) state: ParserState,
    // declared body length, known once the header section is complete
    pub(crate) content_length: Option<usize>,

    // bytes of request line and header section consumed so far
    pub(crate) head_len: usize,
    pub(crate) max_header_size: usize,
    pub(crate) max_body_size: usize,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_HEADER_SIZE, DEFAULT_MAX_BODY_SIZE)
    }

    /// `max_header_size` bounds the request line plus header section,
    /// terminator included. `max_body_size` bounds the body.
    pub fn with_limits(max_header_size: usize, max_body_size: usize) -> Self {
        Self {
            line: RequestLine::default(),
            headers: HttpHeaders::new(),
            body: Vec::new(),
            state: ParserState::Init,
            content_length: None,
            head_len: 0,
            max_header_size,
            max_body_size,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}
