use vcache_keys::{compute_key, decode};

/// Separator placed between the upstream URL and any extra parameters when a
/// player-facing proxy URL is built.
pub const PROXY_SEPARATOR: &str = "&jeffmony&";

/// The upstream resource behind a proxied request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxiedTarget {
    /// Original upstream URL of the resource.
    pub url: String,
    /// Whatever followed the [separator](PROXY_SEPARATOR), if present.
    pub extra: Option<String>,
}
impl ProxiedTarget {
    /// Unpack a resource path as returned by
    /// [`extract_resource_url`](crate::extract_resource_url).
    ///
    /// The path is percent-decoded first; if that fails the raw path is used.
    ///
    /// ```
    /// use vcache_request::ProxiedTarget;
    /// let target = ProxiedTarget::parse("http%3A%2F%2Fx.com%2Fa.mp4&jeffmony&{}");
    /// assert_eq!(target.url, "http://x.com/a.mp4");
    /// assert_eq!(target.extra.as_deref(), Some("{}"));
    /// ```
    pub fn parse(path: &str) -> Self {
        let decoded = decode(path).unwrap_or_else(|| path.to_string());
        match decoded.split_once(PROXY_SEPARATOR) {
            Some((url, extra)) => Self {
                url: url.to_string(),
                extra: Some(extra.to_string()),
            },
            None => Self { url: decoded, extra: None },
        }
    }

    /// Cache key of the upstream URL.
    pub fn cache_key(&self) -> String {
        compute_key(&self.url)
    }
}
