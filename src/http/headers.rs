//! HTTP headers abstraction for [`HttpRequest`](crate::http::request::HttpRequest) and
//! [`ResponseWriter`](crate::http::response::ResponseWriter)
//!
//! Header names are case-insensitive: every name is normalized to lower case
//! before it is stored or looked up. Entries live in an ordered map so that
//! serialization follows insertion order.
//!
//! A name is stored at most once. When a name repeats, the new value is
//! appended to the existing one separated by `", "` (RFC 9110 §5.2), so the
//! combination happens at insertion time rather than in the storage layout.
//!
//! [`HttpHeaders::parse`] is resumable: it consumes only complete lines and
//! reports how many bytes it used, leaving the rest for the next call.

use indexmap::IndexMap;

use crate::http::error::ParseError;

pub(crate) const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    headers: IndexMap<String, String>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    /// Adds a header, combining with any existing value for the same name.
    pub fn set(&mut self, name: &str, value: &str) {
        let key = name.to_ascii_lowercase();
        match self.headers.get_mut(&key) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => {
                self.headers.insert(key, value.to_string());
            }
        }
    }

    /// Overwrites the value for `name`, keeping its position if it already exists.
    pub fn replace(&mut self, name: &str, value: &str) {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.headers.shift_remove(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Renders every entry as `name: value\r\n`, without the section terminator.
    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, value) in &self.headers {
            result.push_str(&format!("{}: {}\r\n", name, value));
        }
        result
    }

    /// Parses as many complete field lines as `data` holds.
    ///
    /// Returns the number of bytes consumed and whether the header section is
    /// complete. An empty line ends the section only when it sits at the very
    /// start of `data`; otherwise parsing stops in front of it and the next
    /// call picks it up. Returns `(0, false)` when no full line is available.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), ParseError> {
        let mut read = 0;
        let mut done = false;

        while let Some(idx) = find_crlf(&data[read..]) {
            if idx == 0 {
                if read == 0 {
                    read += CRLF.len();
                    done = true;
                }
                break;
            }

            let line = &data[read..read + idx];
            let (name, value) = parse_field_line(line)?;
            self.set(&name, &value);

            read += idx + CRLF.len();
        }

        Ok((read, done))
    }
}

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF)
}

/// Splits `name: value` and validates the name.
fn parse_field_line(line: &[u8]) -> Result<(String, String), ParseError> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(ParseError::MalformedFieldLine)?;

    let raw_name = &line[..colon];
    // field-name ":" with no whitespace in between
    if matches!(raw_name.last(), Some(b' ') | Some(b'\t')) {
        return Err(ParseError::MalformedFieldLine);
    }

    let name = String::from_utf8_lossy(raw_name.trim_ascii());
    let value = String::from_utf8_lossy(line[colon + 1..].trim_ascii());

    if !is_token(&name) {
        return Err(ParseError::InvalidFieldName(name.into_owned()));
    }

    Ok((name.into_owned(), value.into_owned()))
}

pub fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'/' | b'~'
        )
}
