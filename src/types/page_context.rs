use url::{ParseError, Url};

/// The page load a gate run is evaluated for.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub url: String,
    pub hostname: String,
    pub user_agent: String,
}

impl PageContext {
    /// Build a context from a full URL, deriving the hostname from it.
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        let url = url.into();
        let hostname = hostname_of(&url);
        Self {
            url,
            hostname,
            user_agent: user_agent.into(),
        }
    }
}

/// Hostname as a browser resolves `location.hostname`.
///
/// A URL without a scheme is read as `http://`. Anything that still fails
/// to parse, or has no host, yields an empty hostname, which no bypass
/// entry matches.
fn hostname_of(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{url}")),
        other => other,
    };
    parsed
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_from_url() {
        assert_eq!(hostname_of("http://localhost:8080/a/b"), "localhost");
        assert_eq!(hostname_of("https://user:pw@shop.example.com/x?y"), "shop.example.com");
        assert_eq!(hostname_of("https://[::1]:3000/"), "[::1]");
        assert_eq!(hostname_of("HTTP://LocalHost/"), "localhost");
        assert_eq!(hostname_of("example.org"), "example.org");
    }

    #[test]
    fn backslash_ends_the_authority() {
        assert_eq!(hostname_of("http://localhost\\admin"), "localhost");
        assert_eq!(hostname_of("https://example.com\\x@evil.test/"), "example.com");
    }

    #[test]
    fn unparseable_url_has_no_hostname() {
        assert_eq!(hostname_of("http://"), "");
        assert_eq!(hostname_of("http://[::1"), "");
        assert_eq!(hostname_of("file:///etc/passwd"), "");
    }

    #[test]
    fn context_derives_hostname() {
        let page = PageContext::new("https://example.com/pay#top", "UA");
        assert_eq!(page.hostname, "example.com");
        assert_eq!(page.url, "https://example.com/pay#top");
    }
}
