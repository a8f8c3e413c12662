use crate::http::request::ParserState;
use crate::http::status::HttpStatus;

/// Errors raised while turning raw bytes into an [`HttpRequest`](crate::http::request::HttpRequest).
///
/// Every variant is fatal for the request it was raised on.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("bad start line")]
    BadStartLine,

    #[error("malformed field line")]
    MalformedFieldLine,

    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    #[error("request head exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },

    #[error("body of {length} bytes exceeds {limit} bytes")]
    PayloadTooLarge { length: usize, limit: usize },

    #[error("unsupported body encoding: {0}")]
    UnsupportedBodyEncoding(String),

    #[error("request in error state")]
    RequestInErrorState,

    #[error("unexpected end of stream in {state} state")]
    UnexpectedEof { state: ParserState },

    #[error("i/o error while reading request: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    // Parser errors are kept apart from status codes and mapped here.
    pub fn status(&self) -> HttpStatus {
        match self {
            // 431 Request Header Fields Too Large
            ParseError::HeaderTooLarge { .. } => HttpStatus::Other(431),
            // 413 Content Too Large
            ParseError::PayloadTooLarge { .. } => HttpStatus::Other(413),
            _ => HttpStatus::BadRequest,
        }
    }
}
