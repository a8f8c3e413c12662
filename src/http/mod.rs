//! HTTP/1.1 protocol engine: header map, incremental request parser and
//! response writer. Nothing in here touches sockets directly; the parser
//! reads from any async byte source and the writer writes to any async sink.

pub mod error;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;

pub use error::ParseError;
pub use headers::HttpHeaders;
pub use parser::read_request;
pub use request::{HttpRequest, ParserState, RequestLine};
pub use response::{ResponseWriter, WriterState, default_headers};
pub use status::HttpStatus;
