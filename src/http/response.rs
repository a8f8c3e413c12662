//! HTTP/1.1 response writer.
//!
//! [`ResponseWriter`] writes straight to the connection sink. A response is
//! a status line, one header section, then the body. When the body length is
//! not known up front the body can be sent with chunked transfer encoding:
//!
//! ```text
//! <hex size>\r\n<payload>\r\n     one per chunk
//! 0\r\n                           last chunk
//! <name>: <value>\r\n             trailer fields, announced by `Trailer:`
//! \r\n
//! ```
//!
//! Trailer values are only known once the whole body has been produced, which
//! is why they follow the zero-size chunk instead of living in the header block.

use async_std::io::{Read, ReadExt, Write, WriteExt};

use crate::http::headers::{CRLF, HttpHeaders};
use crate::http::status::HttpStatus;

/// How far a response has progressed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WriterState {
    StatusLine,
    Headers,
    Body,
}

pub struct ResponseWriter<W> {
    sink: W,
    state: WriterState,
}

/// Headers sent with every plain response.
pub fn default_headers(content_len: usize) -> HttpHeaders {
    let mut headers = HttpHeaders::new();
    headers.set("content-length", &content_len.to_string());
    headers.set("connection", "close");
    headers.set("content-type", "text/plain");
    headers
}

impl<W> ResponseWriter<W>
where
    W: Write + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::StatusLine,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Whether anything has been written yet.
    pub fn is_started(&self) -> bool {
        self.state > WriterState::StatusLine
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// `HTTP/1.1 <code> <reason>\r\n`
    pub async fn write_status_line(&mut self, status: HttpStatus) -> std::io::Result<()> {
        let line = format!("HTTP/1.1 {} {}\r\n", status.code(), status.reason());
        self.sink.write_all(line.as_bytes()).await?;
        self.state = WriterState::Headers;
        Ok(())
    }

    /// Writes every entry in iteration order followed by the empty line
    /// that ends the section.
    pub async fn write_headers(&mut self, headers: &HttpHeaders) -> std::io::Result<()> {
        let mut block = headers.stringify().into_bytes();
        block.extend_from_slice(CRLF);
        self.sink.write_all(&block).await?;
        self.state = WriterState::Body;
        Ok(())
    }

    pub async fn write_body(&mut self, body: &[u8]) -> std::io::Result<()> {
        self.sink.write_all(body).await?;
        self.state = WriterState::Body;
        Ok(())
    }

    /// Writes a complete plain response: status line, [`default_headers`]
    /// and `body`.
    pub async fn write_plain(&mut self, status: HttpStatus, body: &[u8]) -> std::io::Result<()> {
        self.write_status_line(status).await?;
        self.write_headers(&default_headers(body.len())).await?;
        self.write_body(body).await
    }

    /// Frames `data` as one chunk. An empty slice writes nothing, since a
    /// zero-size chunk would end the body.
    pub async fn write_chunk(&mut self, data: &[u8]) -> std::io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        self.write_body(format!("{:x}\r\n", data.len()).as_bytes())
            .await?;
        self.write_body(data).await?;
        self.write_body(CRLF).await
    }

    /// Writes the zero-size last chunk. Trailers, if any, come next.
    pub async fn write_chunked_body_done(&mut self) -> std::io::Result<()> {
        self.write_body(b"0\r\n").await
    }

    /// Writes the trailer fields and the final CRLF of a chunked body.
    pub async fn write_trailers(&mut self, trailers: &HttpHeaders) -> std::io::Result<()> {
        self.write_headers(trailers).await
    }

    /// Copies `upstream` to the sink as chunks of at most `chunk_size` bytes
    /// and writes the last chunk. Returns the full body so the caller can
    /// compute trailer values before calling [`write_trailers`](Self::write_trailers).
    pub async fn stream_chunked<R>(
        &mut self,
        upstream: &mut R,
        chunk_size: usize,
    ) -> std::io::Result<Vec<u8>>
    where
        R: Read + Unpin,
    {
        let mut full_body = Vec::new();
        let mut buf = vec![0u8; chunk_size.max(1)];

        loop {
            let n = match upstream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            full_body.extend_from_slice(&buf[..n]);
            self.write_chunk(&buf[..n]).await?;
        }

        self.write_chunked_body_done().await?;
        Ok(full_body)
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        self.sink.flush().await
    }
}
