//! Incremental HTTP/1.1 request parser.
//!
//! [`HttpRequest::parse`] is a state machine fed with whatever bytes are
//! currently buffered. It returns how many of them it consumed; the caller
//! keeps the rest, appends newly read bytes after them, and calls again until
//! the request is `Done`. Zero consumption just means more input is needed.
//!
//! ```text
//! Init --request line--> Header --empty line--> Body --content-length--> Done
//!                                     \__________ no body _____________/
//! ```
//!
//! Any error moves the request to `Error`, after which every call fails with
//! [`ParseError::RequestInErrorState`].
//!
//! [`read_request`] drives the machine over an async byte source.

use async_std::io::{Read, ReadExt};

use crate::config::ServerConfig;
use crate::http::error::ParseError;
use crate::http::headers::{CRLF, find_crlf};
use crate::http::request::{HttpRequest, ParserState, RequestLine};

const HTTP_VERSION: &[u8] = b"1.1";

impl HttpRequest {
    /// Feeds the currently visible bytes to the parser and returns how many
    /// of them were consumed.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        if self.state == ParserState::Error {
            return Err(ParseError::RequestInErrorState);
        }

        self.advance(data).inspect_err(|_| self.state = ParserState::Error)
    }

    fn advance(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut read = 0;

        loop {
            let current = &data[read..];
            let in_head = self.in_head();
            let n = match self.state {
                ParserState::Error => return Err(ParseError::RequestInErrorState),
                ParserState::Done => break,
                _ if current.is_empty() => break,
                ParserState::Init => self.parse_request_line(current)?,
                ParserState::Header => self.parse_headers(current)?,
                ParserState::Body => self.parse_body(current)?,
            };

            if in_head {
                self.head_len += n;
                self.check_head_size(0)?;
            }

            if n == 0 {
                // needs more data
                break;
            }
            read += n;
        }

        // bytes still waiting for a CRLF count against the head limit too
        self.check_head_size(data.len() - read)?;

        Ok(read)
    }

    fn in_head(&self) -> bool {
        matches!(self.state, ParserState::Init | ParserState::Header)
    }

    fn check_head_size(&self, pending: usize) -> Result<(), ParseError> {
        let head_len = if self.in_head() {
            self.head_len + pending
        } else {
            self.head_len
        };

        if head_len > self.max_header_size {
            return Err(ParseError::HeaderTooLarge {
                limit: self.max_header_size,
            });
        }
        Ok(())
    }

    /// Applies the end-of-stream rule once the byte source is exhausted.
    ///
    /// A body without a declared length ends with the stream; anything else
    /// that is not `Done` yet was cut short.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        match self.state {
            ParserState::Done => Ok(()),
            ParserState::Error => Err(ParseError::RequestInErrorState),
            ParserState::Body if self.content_length.is_none() => {
                self.state = ParserState::Done;
                Ok(())
            }
            state @ (ParserState::Init | ParserState::Header | ParserState::Body) => {
                self.state = ParserState::Error;
                Err(ParseError::UnexpectedEof { state })
            }
        }
    }

    fn parse_request_line(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let Some(end) = find_crlf(data) else {
            return Ok(0);
        };

        // METHOD SP TARGET SP HTTP/VERSION
        let parts: Vec<&[u8]> = data[..end].split(|&b| b == b' ').collect();
        let &[method, target, version] = parts.as_slice() else {
            return Err(ParseError::BadStartLine);
        };

        let version_parts: Vec<&[u8]> = version.split(|&b| b == b'/').collect();
        if version_parts.len() != 2 || version_parts[0] != b"HTTP" || version_parts[1] != HTTP_VERSION {
            return Err(ParseError::BadStartLine);
        }

        let method = std::str::from_utf8(method).map_err(|_| ParseError::BadStartLine)?;
        let target = std::str::from_utf8(target).map_err(|_| ParseError::BadStartLine)?;

        self.line = RequestLine {
            method: method.to_string(),
            target: target.to_string(),
            version: "1.1".to_string(),
        };
        self.state = ParserState::Header;

        Ok(end + CRLF.len())
    }

    fn parse_headers(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let (n, done) = self.headers.parse(data)?;

        if done {
            self.state = self.enter_body()?;
        }

        Ok(n)
    }

    /// Decides what follows the header section.
    fn enter_body(&mut self) -> Result<ParserState, ParseError> {
        if let Some(encoding) = self.headers.get("transfer-encoding") {
            if encoding
                .split(',')
                .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
            {
                return Err(ParseError::UnsupportedBodyEncoding(encoding.to_string()));
            }
        }

        let Some(value) = self.headers.get("content-length") else {
            return Ok(ParserState::Done);
        };

        // digits only: `usize::from_str` would also take a leading `+`
        let length = Some(value)
            .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|v| v.parse::<usize>().ok())
            .ok_or_else(|| ParseError::InvalidContentLength(value.to_string()))?;

        if length > self.max_body_size {
            return Err(ParseError::PayloadTooLarge {
                length,
                limit: self.max_body_size,
            });
        }

        self.content_length = Some(length);
        if length > 0 {
            Ok(ParserState::Body)
        } else {
            Ok(ParserState::Done)
        }
    }

    fn parse_body(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let Some(length) = self.content_length else {
            // unbounded body, only end-of-stream finishes it
            let length = self.body.len() + data.len();
            if length > self.max_body_size {
                return Err(ParseError::PayloadTooLarge {
                    length,
                    limit: self.max_body_size,
                });
            }
            self.body.extend_from_slice(data);
            return Ok(data.len());
        };

        let remaining = std::cmp::min(data.len(), length - self.body.len());
        self.body.extend_from_slice(&data[..remaining]);

        if self.body.len() == length {
            self.state = ParserState::Done;
        }

        Ok(remaining)
    }
}

/// Reads and incrementally parses a request from `reader`.
///
/// Unconsumed bytes are moved to the front of the buffer before the next
/// read. The buffer starts at `config.buffer_size` bytes and doubles whenever
/// it is full, so a single line longer than the initial size still parses.
/// Growth is bounded by the head and body limits, which the parser enforces
/// on every call.
pub async fn read_request<R>(reader: &mut R, config: &ServerConfig) -> Result<HttpRequest, ParseError>
where
    R: Read + Unpin,
{
    let mut req = HttpRequest::with_limits(config.max_header_size, config.max_body_size);
    let mut buf = vec![0u8; config.buffer_size.max(1)];
    let mut buf_len = 0;

    while !req.state().is_terminal() {
        if buf_len == buf.len() {
            buf.resize(buf.len() * 2, 0);
        }

        let n = match reader.read(&mut buf[buf_len..]).await {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ParseError::Io(e)),
        };

        if n == 0 {
            req.finish()?;
            break;
        }
        buf_len += n;

        let consumed = req.parse(&buf[..buf_len])?;
        buf.copy_within(consumed..buf_len, 0);
        buf_len -= consumed;

        tracing::trace!(state = %req.state(), consumed, buffered = buf_len, "parsed request bytes");
    }

    Ok(req)
}
