pub mod handler;
pub mod server;

pub use handler::{Buffered, BufferedHandler, Handler, HandlerError};
pub use server::Server;
