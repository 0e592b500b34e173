use serde::{Deserialize, Serialize};

/// Metadata describing how much of a resource is cached.
///
/// Stored by [`MetadataStore`](crate::MetadataStore) in the resource's
/// directory. Byte ranges are inclusive and kept sorted and merged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Original (unencoded) URL of the resource.
    pub resource_url: String,
    /// Full length of the resource, once the upstream has reported it.
    #[serde(default)]
    pub total_length: Option<u64>,
    /// Number of bytes cached so far.
    #[serde(default)]
    pub cached_length: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Whether the whole resource is cached.
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub ranges: Vec<(u64, u64)>,
}
impl CacheInfo {
    pub fn new(resource_url: impl Into<String>) -> Self {
        Self {
            resource_url: resource_url.into(),
            ..Default::default()
        }
    }

    /// Cache key (and directory name) of the resource.
    pub fn cache_key(&self) -> String {
        vcache_keys::compute_key(&self.resource_url)
    }

    /// Record that bytes `start..=end` are now cached.
    ///
    /// Overlapping and adjacent ranges are merged, and the cached length and
    /// completion flag are recomputed.
    pub fn record_range(&mut self, start: u64, end: u64) {
        let (start, end) = (start.min(end), start.max(end));
        self.ranges.push((start, end));
        self.ranges.sort_unstable();
        let mut merged: Vec<(u64, u64)> = Vec::with_capacity(self.ranges.len());
        for &(start, end) in &self.ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1.saturating_add(1) => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        self.ranges = merged;
        self.cached_length = self
            .ranges
            .iter()
            .map(|(start, end)| (end - start).saturating_add(1))
            .fold(0, u64::saturating_add);
        self.completed = self.total_length.is_some_and(|total| total > 0 && self.ranges == [(0, total - 1)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[(0, 9)], &[(0, 9)], 10)]
    #[case(&[(0, 9), (10, 19)], &[(0, 19)], 20)]
    #[case(&[(10, 19), (0, 4)], &[(0, 4), (10, 19)], 15)]
    #[case(&[(0, 9), (5, 14)], &[(0, 14)], 15)]
    #[case(&[(0, 99), (10, 19)], &[(0, 99)], 100)]
    #[case(&[(9, 0)], &[(0, 9)], 10)]
    #[case(&[(0, u64::MAX)], &[(0, u64::MAX)], u64::MAX)]
    #[case(&[(0, 9), (20, u64::MAX)], &[(0, 9), (20, u64::MAX)], u64::MAX)]
    fn test_record_range(#[case] recorded: &[(u64, u64)], #[case] expected: &[(u64, u64)], #[case] length: u64) {
        let mut info = CacheInfo::new("http://x.com/a.mp4");
        for &(start, end) in recorded {
            info.record_range(start, end);
        }
        assert_eq!(info.ranges, expected);
        assert_eq!(info.cached_length, length);
    }

    #[test]
    fn test_completion() {
        let mut info = CacheInfo::new("http://x.com/a.mp4");
        info.total_length = Some(100);
        info.record_range(50, 99);
        assert!(!info.completed);
        info.record_range(0, 49);
        assert!(info.completed);
    }

    #[test]
    fn test_unknown_length_never_completes() {
        let mut info = CacheInfo::new("http://x.com/a.mp4");
        info.record_range(0, 99);
        assert!(!info.completed);
    }

    #[test]
    fn test_cache_key() {
        let info = CacheInfo::new("http://x.com/a.mp4");
        assert_eq!(info.cache_key(), vcache_keys::compute_key("http://x.com/a.mp4"));
    }

    #[test]
    fn test_missing_fields_default() {
        let info: CacheInfo = serde_json::from_str(r#"{"resource_url": "http://x.com/a.mp4"}"#).unwrap();
        assert_eq!(info, CacheInfo::new("http://x.com/a.mp4"));
    }
}
