/// Length, in characters, of every key returned by [`compute_key`].
pub const KEY_LENGTH: usize = 32;

/// Derive the cache key for a resource identifier.
///
/// The key is the MD5 digest of the UTF-8 bytes of `input`, rendered as 32
/// lowercase hex characters. MD5 is used for stable, compact directory names;
/// the inputs are URLs chosen by the proxy itself, so collision resistance
/// against adversarial input is not a requirement.
///
/// # Examples
///
/// ```
/// use vcache_keys::compute_key;
/// assert_eq!(compute_key(""), "d41d8cd98f00b204e9800998ecf8427e");
/// assert_eq!(compute_key("http://example.com/a.mp4").len(), 32);
/// ```
pub fn compute_key(input: impl AsRef<str>) -> String {
    format!("{:x}", md5::compute(input.as_ref().as_bytes()))
}
