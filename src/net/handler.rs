//! Handler contracts.
//!
//! There are two ways to produce a response:
//!
//! - [`Handler`] writes straight to the connection. It suits streamed bodies,
//!   but bytes on the wire cannot be taken back, so it has no error return.
//!   Returning without writing anything yields an empty `200`.
//! - [`BufferedHandler`] writes into memory and may fail with a
//!   [`HandlerError`]. Wrapped in [`Buffered`], its output is sent only on
//!   success; on error whatever it wrote is discarded and the error's status
//!   and message are sent instead.

use async_std::net::TcpStream;
use futures_util::future::BoxFuture;

use crate::http::request::HttpRequest;
use crate::http::response::ResponseWriter;
use crate::http::status::HttpStatus;

/// A handler aborting with a specific status instead of a body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HandlerError {
    pub status: HttpStatus,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: impl Into<HttpStatus>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::new(HttpStatus::InternalServerError, err.to_string())
    }
}

/// Application logic invoked once per parsed request, writing to the live
/// connection.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(
        &'a self,
        w: &'a mut ResponseWriter<TcpStream>,
        req: &'a HttpRequest,
    ) -> BoxFuture<'a, ()>;
}

/// Application logic whose response is built in memory and may be replaced
/// by an error response.
pub trait BufferedHandler: Send + Sync + 'static {
    fn call<'a>(
        &'a self,
        w: &'a mut ResponseWriter<Vec<u8>>,
        req: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<(), HandlerError>>;
}

/// Serves a [`BufferedHandler`] as a [`Handler`].
pub struct Buffered<H>(pub H);

impl<H: BufferedHandler> Handler for Buffered<H> {
    fn call<'a>(
        &'a self,
        w: &'a mut ResponseWriter<TcpStream>,
        req: &'a HttpRequest,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut buffer = ResponseWriter::new(Vec::new());

            let result = match self.0.call(&mut buffer, req).await {
                // nothing written: left to the server's empty 200
                Ok(()) if !buffer.is_started() => Ok(()),
                Ok(()) => w.write_body(buffer.get_ref()).await,
                Err(err) => {
                    tracing::debug!(
                        error = %err,
                        discarded = buffer.get_ref().len(),
                        "handler returned an error"
                    );
                    w.write_plain(err.status, err.message.as_bytes()).await
                }
            };

            if let Err(err) = result {
                tracing::debug!(error = %err, "failed to write buffered response");
            }
        })
    }
}
