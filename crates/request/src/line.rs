use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::Regex;
use std::io::{BufRead, ErrorKind as IoErrorKind, Read};
use std::sync::LazyLock;
use tracing::instrument;

/// Buffer capacity to use when wrapping a proxied connection in a
/// [`BufReader`](std::io::BufReader) before handing it to [`extract_resource_url`].
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;
/// Most bytes read looking for the end of the preamble.
pub const MAX_PREAMBLE_SIZE: usize = 8 * DEFAULT_BUFFER_SIZE;

static REQUEST_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"GET /(.*) HTTP").unwrap());

/// Extract the requested resource path from a raw HTTP request preamble.
///
/// Lines are consumed up to (and including) the first empty line, or until
/// the reader is exhausted. The first `GET /<path> HTTP` line found yields
/// `<path>`, returned exactly as it appeared on the wire (no percent-decoding;
/// see [`ProxiedTarget`](crate::ProxiedTarget) for that).
///
/// Only `GET` is recognised: the proxy serves playback traffic only, and any
/// other method results in [`UrlNotFound`](ErrorKind::UrlNotFound). A
/// preamble still unterminated after [`MAX_PREAMBLE_SIZE`] bytes is
/// [`TooLarge`](ErrorKind::TooLarge).
#[instrument(level = "debug", skip(reader))]
pub fn extract_resource_url<R: BufRead>(mut reader: R) -> Result<String> {
    let mut preamble = String::new();
    let mut line = String::new();
    let mut budget = MAX_PREAMBLE_SIZE;
    loop {
        if budget == 0 {
            tracing::debug!(limit = MAX_PREAMBLE_SIZE, "Request preamble exceeds size limit");
            exn::bail!(ErrorKind::TooLarge);
        }
        line.clear();
        let read = match (&mut reader).take(budget as u64).read_line(&mut line) {
            Ok(read) => read,
            Err(e) if e.kind() == IoErrorKind::InvalidData => return Err(e).or_raise(|| ErrorKind::Encoding),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
        };
        budget -= read;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if read == 0 || trimmed.is_empty() {
            break;
        }
        preamble.push_str(trimmed);
        preamble.push('\n');
    }
    match REQUEST_LINE.captures(&preamble).and_then(|c| c.get(1)) {
        Some(path) => Ok(path.as_str().to_string()),
        None => {
            tracing::debug!(lines = preamble.lines().count(), "No GET request line in preamble");
            exn::bail!(ErrorKind::UrlNotFound)
        },
    }
}

/// [`extract_resource_url`] over an in-memory buffer.
///
/// ```
/// use vcache_request::extract_resource_url_from_bytes;
/// let request = b"GET /videos/a.mp4 HTTP/1.1\r\nHost: x\r\n\r\n";
/// assert_eq!(extract_resource_url_from_bytes(request).unwrap(), "videos/a.mp4");
/// assert!(extract_resource_url_from_bytes(b"POST / HTTP/1.1\r\n\r\n").is_err());
/// ```
pub fn extract_resource_url_from_bytes(bytes: impl AsRef<[u8]>) -> Result<String> {
    extract_resource_url(bytes.as_ref())
}
