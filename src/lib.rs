//! Minimal HTTP/1.1 server built on raw byte streams.
//!
//! The request flow for one connection:
//!
//! 1. Accept a TCP connection ([`net::server`])
//! 2. Incrementally parse the request ([`http::parser`])
//! 3. Hand it to a [`Handler`](net::Handler)
//! 4. Write the response ([`http::response`]), then close the connection

pub mod config;
pub mod handler;
pub mod http;
pub mod net;
