//! Chunked streaming with trailers.
//!
//! The body is produced by an upstream reader whose total size is unknown
//! when the headers go out, so it is sent chunked and its SHA-256 and length
//! follow as trailer fields.

use async_std::io::Write;
use sha2::{Digest, Sha256};

use crate::http::headers::HttpHeaders;
use crate::http::response::{ResponseWriter, default_headers};
use crate::http::status::HttpStatus;
use crate::net::handler::HandlerError;

const MAX_LINES: usize = 100;
const CHUNK_SIZE: usize = 32;

const SHA256_TRAILER: &str = "x-content-sha256";
const LENGTH_TRAILER: &str = "x-content-length";

pub async fn serve<W>(w: &mut ResponseWriter<W>, count: &str) -> Result<(), HandlerError>
where
    W: Write + Unpin,
{
    let count = match count.parse::<usize>() {
        Ok(n) if n <= MAX_LINES => n,
        _ => {
            return Err(HandlerError::new(
                HttpStatus::BadRequest,
                format!("line count must be an integer between 0 and {MAX_LINES}\n"),
            ));
        }
    };

    let upstream = generate_lines(count);
    let mut headers = default_headers(0);
    headers.remove("content-length");
    headers.set("transfer-encoding", "chunked");
    headers.set("trailer", SHA256_TRAILER);
    headers.set("trailer", LENGTH_TRAILER);

    w.write_status_line(HttpStatus::Ok).await?;
    w.write_headers(&headers).await?;

    let full_body = w.stream_chunked(&mut upstream.as_slice(), CHUNK_SIZE).await?;

    let mut trailers = HttpHeaders::new();
    trailers.set(SHA256_TRAILER, &hex::encode(Sha256::digest(&full_body)));
    trailers.set(LENGTH_TRAILER, &full_body.len().to_string());
    w.write_trailers(&trailers).await?;

    tracing::debug!(lines = count, bytes = full_body.len(), "streamed chunked body");
    Ok(())
}

fn generate_lines(count: usize) -> Vec<u8> {
    (0..count)
        .map(|id| format!("{{\"id\": {id}, \"line\": \"streamed line number {id}\"}}\n"))
        .collect::<String>()
        .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_std::test]
    async fn trailers_describe_the_streamed_body() {
        let mut w = ResponseWriter::new(Vec::new());

        serve(&mut w, "3").await.unwrap();

        let wire = w.into_inner();
        let text = String::from_utf8(wire).unwrap();
        let (head, rest) = text.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("transfer-encoding: chunked"));
        assert!(head.contains("trailer: x-content-sha256, x-content-length"));
        assert!(!head.contains("\r\ncontent-length:"));

        let expected = generate_lines(3);
        let (_, trailer_block) = rest.split_once("\r\n0\r\n").unwrap();
        assert_eq!(
            trailer_block,
            format!(
                "x-content-sha256: {}\r\nx-content-length: {}\r\n\r\n",
                hex::encode(Sha256::digest(&expected)),
                expected.len()
            )
        );
    }

    #[async_std::test]
    async fn rejects_bad_counts_before_writing() {
        for count in ["abc", "-1", "101"] {
            let mut w = ResponseWriter::new(Vec::new());

            let err = serve(&mut w, count).await.unwrap_err();

            assert_eq!(err.status, HttpStatus::BadRequest);
            assert!(!w.is_started());
        }
    }
}
