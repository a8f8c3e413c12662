//! Demo application served by the binary.
//!
//! - `/yourproblem` answers `400` with an HTML page
//! - `/myproblem` answers `500` with an HTML page
//! - `/stream/<n>` streams `n` generated lines with chunked encoding and
//!   content hash/length trailers
//! - anything else answers `200`

mod responses;
mod router;
mod stream;

use async_std::net::TcpStream;
use futures_util::future::BoxFuture;

use crate::http::request::HttpRequest;
use crate::http::response::ResponseWriter;
use crate::net::handler::Handler;
use router::Route;

pub struct App;

impl Handler for App {
    fn call<'a>(
        &'a self,
        w: &'a mut ResponseWriter<TcpStream>,
        req: &'a HttpRequest,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let result = match router::route(&req.line.target) {
                Route::Stream(count) => stream::serve(w, count).await,
                Route::Page(page) => responses::write_page(w, page).await,
            };

            let Err(err) = result else { return };
            if w.is_started() {
                // a streamed response cannot be recalled
                tracing::warn!(error = %err, target = %req.line.target, "response aborted after it started");
            } else if let Err(io_err) = w.write_plain(err.status, err.message.as_bytes()).await {
                tracing::debug!(error = %io_err, "failed to write error response");
            }
        })
    }
}
