//! Percent-encoding of URL components.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;

/// Percent-encode `input` as a single URL component.
///
/// Everything except ASCII alphanumerics and `-_.~` is escaped from its UTF-8
/// bytes, so the result is safe to embed in a request path.
///
/// ```
/// use vcache_keys::encode;
/// assert_eq!(encode("a b/c"), "a%20b%2Fc");
/// ```
pub fn encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Decode a percent-encoded URL component, returning [`None`] if it is malformed.
///
/// A `None` means "could not decode": callers should keep using the original
/// string rather than treat it as a failure.
///
/// ```
/// use vcache_keys::decode;
/// assert_eq!(decode("a%20b%2Fc").as_deref(), Some("a b/c"));
/// assert_eq!(decode("100%"), None);
/// ```
pub fn decode(input: &str) -> Option<String> {
    match try_decode(input) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!(input, error = ?e, "Could not decode URL component; ignoring");
            None
        },
    }
}

/// Decode a percent-encoded URL component.
///
/// Accepts `+` as an encoded space (form encoding). Escapes must be a `%`
/// followed by exactly two hex digits, and the decoded bytes must be UTF-8.
pub fn try_decode(input: &str) -> Result<String> {
    let bytes = input.as_bytes();
    let mut position = 0;
    while let Some(offset) = bytes[position..].iter().position(|b| *b == b'%') {
        let escape = position + offset;
        let well_formed = bytes
            .get(escape + 1..escape + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            exn::bail!(ErrorKind::Decode(input.to_string()));
        }
        position = escape + 3;
    }
    let spaced = input.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).or_raise(|| ErrorKind::Decode(input.to_string()))?;
    Ok(decoded.into_owned())
}
