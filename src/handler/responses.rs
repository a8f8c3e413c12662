use async_std::io::Write;

use crate::http::response::{ResponseWriter, default_headers};
use crate::http::status::HttpStatus;
use crate::net::handler::HandlerError;

const OK_PAGE: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was handled.</p>
  </body>
</html>
";

const BAD_REQUEST_PAGE: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>The server could not understand your request.</p>
  </body>
</html>
";

const INTERNAL_SERVER_ERROR_PAGE: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Something went wrong on our side.</p>
  </body>
</html>
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Ok,
    BadRequest,
    InternalServerError,
}

impl Page {
    pub fn status(self) -> HttpStatus {
        match self {
            Page::Ok => HttpStatus::Ok,
            Page::BadRequest => HttpStatus::BadRequest,
            Page::InternalServerError => HttpStatus::InternalServerError,
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            Page::Ok => OK_PAGE,
            Page::BadRequest => BAD_REQUEST_PAGE,
            Page::InternalServerError => INTERNAL_SERVER_ERROR_PAGE,
        }
    }
}

pub async fn write_page<W>(w: &mut ResponseWriter<W>, page: Page) -> Result<(), HandlerError>
where
    W: Write + Unpin,
{
    let body = page.body().as_bytes();
    let mut headers = default_headers(body.len());
    headers.replace("content-type", "text/html");

    w.write_status_line(page.status()).await?;
    w.write_headers(&headers).await?;
    w.write_body(body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_std::test]
    async fn page_carries_its_status_and_length() {
        let mut w = ResponseWriter::new(Vec::new());

        write_page(&mut w, Page::BadRequest).await.unwrap();

        let wire = String::from_utf8(w.into_inner()).unwrap();
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(wire.contains(&format!("content-length: {}\r\n", BAD_REQUEST_PAGE.len())));
        assert!(wire.contains("content-type: text/html\r\n"));
        assert!(wire.ends_with(BAD_REQUEST_PAGE));
    }
}
