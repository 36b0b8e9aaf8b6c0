use super::error::Result;
use super::types::DeviceType;
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

/// User-agent tokens that mark a mobile platform.
pub const DEFAULT_MOBILE_TOKENS: [&str; 8] = [
    "Android",
    "webOS",
    "iPhone",
    "iPad",
    "iPod",
    "BlackBerry",
    "IEMobile",
    "Opera Mini",
];

/// Splits user agents into mobile and desktop by substring tokens.
///
/// All tokens are compiled into one case-insensitive Aho-Corasick automaton,
/// so classification is a single pass over the UA regardless of how many
/// tokens are configured.
pub struct DeviceClassifier {
    tokens: AhoCorasick,
}

impl DeviceClassifier {
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let tokens = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostFirst)
            .build(tokens)?;
        Ok(Self { tokens })
    }

    pub fn classify(&self, user_agent: &str) -> DeviceType {
        if self.tokens.is_match(user_agent) {
            DeviceType::Mobile
        } else {
            DeviceType::Pc
        }
    }
}

impl Default for DeviceClassifier {
    fn default() -> Self {
        // The default token set is fixed ASCII and always builds.
        Self::new(DEFAULT_MOBILE_TOKENS).expect("default mobile tokens")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_tokens() {
        let c = DeviceClassifier::default();
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        let android = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/120.0";
        assert_eq!(c.classify(iphone), DeviceType::Mobile);
        assert_eq!(c.classify(android), DeviceType::Mobile);
        assert_eq!(c.classify("Opera/9.80 (J2ME/MIDP; Opera Mini/9.80)"), DeviceType::Mobile);
    }

    #[test]
    fn case_insensitive() {
        let c = DeviceClassifier::default();
        assert_eq!(c.classify("something ANDROID something"), DeviceType::Mobile);
        assert_eq!(c.classify("blackberry9700"), DeviceType::Mobile);
    }

    #[test]
    fn desktop_falls_through() {
        let c = DeviceClassifier::default();
        let win = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0";
        let mac = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) Safari/605.1.15";
        assert_eq!(c.classify(win), DeviceType::Pc);
        assert_eq!(c.classify(mac), DeviceType::Pc);
        assert_eq!(c.classify(""), DeviceType::Pc);
    }

    #[test]
    fn custom_tokens() {
        let c = DeviceClassifier::new(["KaiOS"]).unwrap();
        assert_eq!(c.classify("Mozilla/5.0 (Mobile; LYF/F300B; rv:48.0) KAIOS/2.5"), DeviceType::Mobile);
        assert_eq!(c.classify("Mozilla/5.0 (Linux; Android 14)"), DeviceType::Pc);
    }
}
