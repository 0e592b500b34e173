//! Heuristic detection of mis-decoded ("garbled") text.

use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

/// Ratio of non-linguistic characters above which text counts as garbled.
pub const DEFAULT_GARBLE_THRESHOLD: f32 = 0.4;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{P}+").unwrap());

/// Unicode blocks that count as legitimate text even though they are not
/// alphanumeric: CJK ideographs, CJK/general punctuation and full-width forms.
const CJK_BLOCKS: [RangeInclusive<char>; 6] = [
    // CJK Unified Ideographs
    '\u{4E00}'..='\u{9FFF}',
    // CJK Unified Ideographs Extension A
    '\u{3400}'..='\u{4DBF}',
    // CJK Compatibility Ideographs
    '\u{F900}'..='\u{FAFF}',
    // General Punctuation
    '\u{2000}'..='\u{206F}',
    // CJK Symbols and Punctuation
    '\u{3000}'..='\u{303F}',
    // Halfwidth and Fullwidth Forms
    '\u{FF00}'..='\u{FFEF}',
];

fn is_cjk(c: char) -> bool {
    CJK_BLOCKS.iter().any(|block| block.contains(&c))
}

/// Decides whether decoded text is likely mojibake.
///
/// Whitespace and punctuation are discarded first. Of what remains, any
/// character that is neither alphanumeric nor inside one of the CJK blocks
/// counts against the text; when the share of such characters exceeds the
/// threshold, the text is considered garbled. Text with nothing left to
/// classify is never garbled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GarbleDetector {
    threshold: f32,
}
impl Default for GarbleDetector {
    fn default() -> Self {
        Self::new(DEFAULT_GARBLE_THRESHOLD)
    }
}
impl GarbleDetector {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Share of classifiable characters in `text` that are neither
    /// alphanumeric nor CJK, or [`None`] if nothing is left to classify.
    pub fn noise_ratio(&self, text: &str) -> Option<f32> {
        let collapsed = WHITESPACE.replace_all(text, "");
        let stripped = PUNCTUATION.replace_all(&collapsed, "");
        let residual = stripped.trim_matches(|c: char| c <= ' ');
        let (total, noise) = residual.chars().fold((0usize, 0usize), |(total, noise), c| {
            let linguistic = c.is_alphanumeric() || is_cjk(c);
            (total + 1, noise + usize::from(!linguistic))
        });
        match total {
            0 => None,
            _ => Some(noise as f32 / total as f32),
        }
    }

    pub fn is_garbled(&self, text: &str) -> bool {
        self.noise_ratio(text).is_some_and(|ratio| ratio > self.threshold)
    }
}

/// [`GarbleDetector::is_garbled`] with the [default threshold](DEFAULT_GARBLE_THRESHOLD).
///
/// ```
/// use vcache_keys::is_garbled;
/// assert!(!is_garbled("hello world"));
/// assert!(is_garbled("\u{FFFD}\u{FFFD}\u{FFFD}ab"));
/// ```
pub fn is_garbled(text: &str) -> bool {
    GarbleDetector::default().is_garbled(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hello world")]
    #[case("Episode 01 - The Beginning.mp4")]
    #[case("中文视频")]
    #[case("ｆｕｌｌｗｉｄｔｈ")]
    #[case("日本語の動画、第一話。")]
    #[case("Ünïcödé tëxt")]
    fn test_readable_text(#[case] text: &str) {
        assert!(!is_garbled(text));
    }

    #[rstest]
    #[case("\u{FFFD}\u{FFFD}\u{FFFD}")]
    #[case("ab\u{FFFD}\u{FFFD}\u{FFFD}")]
    #[case("¤¤¤¤ video")]
    #[case("╔═╗╚═╝")]
    fn test_garbled_text(#[case] text: &str) {
        assert!(is_garbled(text));
    }

    #[rstest]
    #[case("")]
    #[case("   \t\r\n")]
    #[case("...,,,!!!")]
    fn test_nothing_to_classify(#[case] text: &str) {
        assert_eq!(GarbleDetector::default().noise_ratio(text), None);
        assert!(!is_garbled(text));
    }

    #[test]
    fn test_percent_escapes_are_stripped_as_punctuation() {
        // `%` is punctuation and the hex digits are alphanumeric, so undecoded
        // escapes alone do not look garbled.
        assert_eq!(GarbleDetector::default().noise_ratio("%E4%B8%AD%E6%96%87"), Some(0.0));
        assert!(!is_garbled("%E4%B8%AD%E6%96%87"));
    }

    #[rstest]
    #[case("a_b-c(d)", 0.0)]
    #[case("\"a\"@b#c", 0.0)]
    #[case("$$$a", 0.75)]
    #[case("a+", 0.5)]
    #[case("<a>b", 0.5)]
    fn test_ascii_symbols_are_not_punctuation(#[case] text: &str, #[case] expected: f32) {
        assert_eq!(GarbleDetector::default().noise_ratio(text), Some(expected));
    }

    #[test]
    fn test_letters_t_r_n_are_kept() {
        assert_eq!(GarbleDetector::default().noise_ratio("trn\u{FFFD}"), Some(0.25));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 2 of 5 characters are noise: exactly 0.4
        let text = "abc\u{FFFD}\u{FFFD}";
        assert!(!GarbleDetector::new(0.4).is_garbled(text));
        assert!(GarbleDetector::new(0.39).is_garbled(text));
    }

    #[test]
    fn test_custom_threshold() {
        let strict = GarbleDetector::new(0.1);
        assert!(strict.is_garbled("abcdefgh\u{FFFD}"));
        assert!(!is_garbled("abcdefgh\u{FFFD}"));
        assert_eq!(strict.threshold(), 0.1);
    }
}
