use std::fmt;

/// Response status. `Other` carries any code; known codes compare equal to
/// their named variant and keep their reason phrase either way.
#[derive(Debug, Clone, Copy)]
pub enum HttpStatus {
    Ok,
    BadRequest,
    InternalServerError,
    Other(u16),
}

impl HttpStatus {
    pub fn code(self) -> u16 {
        match self {
            HttpStatus::Ok => 200,
            HttpStatus::BadRequest => 400,
            HttpStatus::InternalServerError => 500,
            HttpStatus::Other(code) => code,
        }
    }

    /// Reason phrase for the status line; unknown codes get an empty one.
    pub fn reason(self) -> &'static str {
        match self.code() {
            200 => "OK",
            400 => "Bad Request",
            500 => "Internal Server Error",
            _ => "",
        }
    }
}

impl PartialEq for HttpStatus {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for HttpStatus {}

impl From<u16> for HttpStatus {
    fn from(code: u16) -> Self {
        match code {
            200 => HttpStatus::Ok,
            400 => HttpStatus::BadRequest,
            500 => HttpStatus::InternalServerError,
            other => HttpStatus::Other(other),
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}
