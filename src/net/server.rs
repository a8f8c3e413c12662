//! Connection server.
//!
//! This module owns the networking side only:
//! - accepting TCP connections,
//! - running one parse → handle → write cycle per connection,
//! - closing the connection afterwards (no keep-alive).
//!
//! Request parsing is delegated to [`read_request`], response framing to
//! [`ResponseWriter`], and everything the response says to the [`Handler`].
//!
//! ## Shutdown
//!
//! [`Server::close`] sets the atomic `closed` flag, then closes the stop
//! channel, which fails the pending accept. The accept loop checks the flag on
//! every accept error: set means an intentional shutdown (exit quietly),
//! unset means a transport fault (log, back off, keep accepting).
//! Connections already being served are left to finish on their own.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_std::channel::{self, Receiver, Sender};
use async_std::net::{TcpListener, TcpStream};
use async_std::task::{self, JoinHandle};
use futures_util::FutureExt;
use futures_util::future::{self, Either};

use crate::config::ServerConfig;
use crate::http::parser::read_request;
use crate::http::response::ResponseWriter;
use crate::http::status::HttpStatus;
use crate::net::handler::Handler;

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Delay before the next accept after `consecutive_errors` failures in a row:
/// doubles from [`ACCEPT_BACKOFF_BASE`] up to [`ACCEPT_BACKOFF_MAX`].
fn accept_backoff(consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1 << exponent)
        .min(ACCEPT_BACKOFF_MAX)
}

pub struct Server {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    stop: Sender<()>,
    accept_loop: Option<JoinHandle<()>>,
}

impl Server {
    /// Binds the configured address and starts accepting connections in the
    /// background.
    pub async fn serve<H: Handler>(config: &ServerConfig, handler: H) -> std::io::Result<Server> {
        let listener = TcpListener::bind(config.socket_addr()).await?;
        let local_addr = listener.local_addr()?;
        let closed = Arc::new(AtomicBool::new(false));
        let (stop, stopped) = channel::bounded(1);

        tracing::info!(address = %local_addr, "listening for connections");

        let accept_loop = task::spawn(Self::listen(
            listener,
            stopped,
            closed.clone(),
            Arc::new(handler),
            Arc::new(config.clone()),
        ));

        Ok(Server {
            local_addr,
            closed,
            stop,
            accept_loop: Some(accept_loop),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops accepting and waits until the listening socket is released.
    pub async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.stop.close();

        if let Some(accept_loop) = self.accept_loop.take() {
            accept_loop.await;
            tracing::info!(address = %self.local_addr, "server closed");
        }
    }

    async fn listen<H: Handler>(
        listener: TcpListener,
        stopped: Receiver<()>,
        closed: Arc<AtomicBool>,
        handler: Arc<H>,
        config: Arc<ServerConfig>,
    ) {
        let mut consecutive_errors = 0u32;

        loop {
            let accepted = match future::select(Box::pin(listener.accept()), Box::pin(stopped.recv())).await {
                Either::Left((accepted, _)) => accepted,
                Either::Right(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionAborted,
                    "listener closed",
                )),
            };

            match accepted {
                Ok((stream, peer)) => {
                    consecutive_errors = 0;
                    task::spawn(Self::handle_client(stream, peer, handler.clone(), config.clone()));
                }
                Err(err) => {
                    if closed.load(Ordering::SeqCst) {
                        tracing::debug!("accept loop stopped");
                        return;
                    }
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    let backoff = accept_backoff(consecutive_errors);
                    tracing::error!(error = %err, ?backoff, "accept error");
                    task::sleep(backoff).await;
                }
            }
        }
    }

    /// Serves a single connection. The stream is dropped, and the
    /// connection closed, on every return path.
    async fn handle_client<H: Handler>(
        stream: TcpStream,
        peer: SocketAddr,
        handler: Arc<H>,
        config: Arc<ServerConfig>,
    ) {
        let mut reader = stream.clone();
        let mut w = ResponseWriter::new(stream);

        let req = match read_request(&mut reader, &config).await {
            Ok(req) => req,
            Err(err) => {
                tracing::warn!(%peer, error = %err, "rejecting request");
                Self::write_fallback(&mut w, err.status(), b"").await;
                return;
            }
        };

        tracing::debug!(
            %peer,
            method = %req.line.method,
            target = %req.line.target,
            body_len = req.body.len(),
            "request parsed"
        );

        let outcome = AssertUnwindSafe(handler.call(&mut w, &req))
            .catch_unwind()
            .await;

        match outcome {
            Ok(()) => {
                if !w.is_started() {
                    Self::write_fallback(&mut w, HttpStatus::Ok, b"").await;
                }
            }
            Err(_) => {
                tracing::error!(%peer, target = %req.line.target, "handler panicked");
                if !w.is_started() {
                    Self::write_fallback(&mut w, HttpStatus::InternalServerError, b"").await;
                }
            }
        }

        if let Err(err) = w.flush().await {
            tracing::debug!(%peer, error = %err, "failed to flush response");
        }
    }

    /// Best effort: the connection is closing regardless, so write errors
    /// are only logged.
    async fn write_fallback(w: &mut ResponseWriter<TcpStream>, status: HttpStatus, body: &[u8]) {
        let result: std::io::Result<()> = async {
            w.write_plain(status, body).await?;
            w.flush().await
        }
        .await;

        if let Err(err) = result {
            tracing::debug!(error = %err, %status, "failed to write response");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        // lets the detached accept loop exit and release the socket
        self.closed.store(true, Ordering::SeqCst);
        self.stop.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::HttpRequest;
    use crate::net::handler::{Buffered, BufferedHandler, HandlerError};
    use async_std::io::{ReadExt, WriteExt};
    use futures_util::future::BoxFuture;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback() -> ServerConfig {
        ServerConfig {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..ServerConfig::default()
        }
    }

    async fn roundtrip(addr: SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    struct Echo;

    impl BufferedHandler for Echo {
        fn call<'a>(
            &'a self,
            w: &'a mut ResponseWriter<Vec<u8>>,
            req: &'a HttpRequest,
        ) -> BoxFuture<'a, Result<(), HandlerError>> {
            Box::pin(async move {
                let mut body = format!("{} {}|", req.line.method, req.line.target).into_bytes();
                body.extend_from_slice(&req.body);

                w.write_plain(HttpStatus::Ok, &body).await?;
                Ok(())
            })
        }
    }

    struct Refuse;

    impl BufferedHandler for Refuse {
        fn call<'a>(
            &'a self,
            _w: &'a mut ResponseWriter<Vec<u8>>,
            _req: &'a HttpRequest,
        ) -> BoxFuture<'a, Result<(), HandlerError>> {
            Box::pin(async move { Err(HandlerError::new(HttpStatus::BadRequest, "nope")) })
        }
    }

    /// Starts a `200` and then gives up.
    struct Regret;

    impl BufferedHandler for Regret {
        fn call<'a>(
            &'a self,
            w: &'a mut ResponseWriter<Vec<u8>>,
            _req: &'a HttpRequest,
        ) -> BoxFuture<'a, Result<(), HandlerError>> {
            Box::pin(async move {
                w.write_status_line(HttpStatus::Ok).await?;
                w.write_headers(&crate::http::response::default_headers(100)).await?;
                w.write_body(b"half a bo").await?;
                Err(HandlerError::new(HttpStatus::BadRequest, "nope"))
            })
        }
    }

    struct Silent;

    impl Handler for Silent {
        fn call<'a>(
            &'a self,
            _w: &'a mut ResponseWriter<TcpStream>,
            _req: &'a HttpRequest,
        ) -> BoxFuture<'a, ()> {
            Box::pin(async move {})
        }
    }

    struct Explode;

    impl Handler for Explode {
        fn call<'a>(
            &'a self,
            _w: &'a mut ResponseWriter<TcpStream>,
            req: &'a HttpRequest,
        ) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                if req.line.target.starts_with('/') {
                    panic!("cannot handle {}", req.line.target);
                }
            })
        }
    }

    #[test]
    fn accept_backoff_doubles_up_to_the_cap() {
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(4), Duration::from_millis(80));
        assert_eq!(accept_backoff(8), ACCEPT_BACKOFF_MAX);
        assert_eq!(accept_backoff(u32::MAX), ACCEPT_BACKOFF_MAX);
    }

    #[async_std::test]
    async fn serves_one_request_per_connection() {
        let mut server = Server::serve(&loopback(), Buffered(Echo)).await.unwrap();

        let response = roundtrip(
            server.local_addr(),
            b"POST /coffee HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello",
        )
        .await;

        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\n\
             content-length: 18\r\n\
             connection: close\r\n\
             content-type: text/plain\r\n\
             \r\n\
             POST /coffee|hello"
        );

        server.close().await;
    }

    #[async_std::test]
    async fn malformed_request_gets_400() {
        let mut server = Server::serve(&loopback(), Buffered(Echo)).await.unwrap();

        let response = roundtrip(server.local_addr(), b"GET / HTTP/2.0\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("content-length: 0\r\n"));

        server.close().await;
    }

    #[async_std::test]
    async fn oversized_requests_get_431_and_413() {
        let config = ServerConfig {
            max_header_size: 64,
            max_body_size: 8,
            ..loopback()
        };
        let mut server = Server::serve(&config, Buffered(Echo)).await.unwrap();

        let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(100));
        let response = roundtrip(server.local_addr(), raw.as_bytes()).await;
        assert!(response.starts_with("HTTP/1.1 431 \r\n"), "{response}");

        let response = roundtrip(
            server.local_addr(),
            b"POST / HTTP/1.1\r\nContent-Length: 9\r\n\r\n123456789",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 413 \r\n"), "{response}");

        server.close().await;
    }

    #[async_std::test]
    async fn handler_error_is_written_verbatim() {
        let mut server = Server::serve(&loopback(), Buffered(Refuse)).await.unwrap();

        let response = roundtrip(server.local_addr(), b"GET / HTTP/1.1\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("content-length: 4\r\n"));
        assert!(response.ends_with("\r\n\r\nnope"));

        server.close().await;
    }

    #[async_std::test]
    async fn handler_error_replaces_partial_response() {
        let mut server = Server::serve(&loopback(), Buffered(Regret)).await.unwrap();

        let response = roundtrip(server.local_addr(), b"GET / HTTP/1.1\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
        assert!(!response.contains("200 OK"));
        assert!(!response.contains("half a bo"));
        assert!(response.ends_with("content-length: 4\r\nconnection: close\r\ncontent-type: text/plain\r\n\r\nnope"));

        server.close().await;
    }

    #[async_std::test]
    async fn silent_handler_gets_empty_200() {
        let mut server = Server::serve(&loopback(), Silent).await.unwrap();

        let response = roundtrip(server.local_addr(), b"GET / HTTP/1.1\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("content-length: 0\r\nconnection: close\r\ncontent-type: text/plain\r\n\r\n"));

        server.close().await;
    }

    #[async_std::test]
    async fn handler_panic_becomes_500() {
        let mut server = Server::serve(&loopback(), Explode).await.unwrap();

        let response = roundtrip(server.local_addr(), b"GET /boom HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

        // the accept loop survives
        let response = roundtrip(server.local_addr(), b"GET /again HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

        server.close().await;
    }

    #[async_std::test]
    async fn stalled_connection_does_not_block_others() {
        let mut server = Server::serve(&loopback(), Buffered(Echo)).await.unwrap();
        let addr = server.local_addr();

        let mut stalled = TcpStream::connect(addr).await.unwrap();
        stalled.write_all(b"GET /slow HTTP/1.1\r\nHo").await.unwrap();

        let response = roundtrip(addr, b"GET /fast HTTP/1.1\r\n\r\n").await;
        assert!(response.ends_with("GET /fast|"));

        stalled.write_all(b"st: x\r\n\r\n").await.unwrap();
        let mut out = String::new();
        stalled.read_to_string(&mut out).await.unwrap();
        assert!(out.ends_with("GET /slow|"));

        server.close().await;
    }

    #[async_std::test]
    async fn close_releases_the_listener() {
        let mut server = Server::serve(&loopback(), Buffered(Echo)).await.unwrap();
        let addr = server.local_addr();
        assert!(!server.is_closed());

        server.close().await;

        assert!(server.is_closed());
        assert!(TcpStream::connect(addr).await.is_err());

        // closing twice is harmless
        server.close().await;
    }
}
