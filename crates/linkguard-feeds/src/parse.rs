//! Indicator list parsing.

use linkguard_core::{has_scheme, NormalizedUrl};

/// Indicators extracted from a raw feed download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIndicators {
    /// Scheme-less normalized URLs (`host[:port]/path[?query]`)
    pub urls: Vec<String>,
    /// Bare hosts (whole-site listings)
    pub hosts: Vec<String>,
    /// Lines that could not be parsed
    pub skipped: usize,
}

impl ParsedIndicators {
    /// Total number of usable indicators
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len() + self.hosts.len()
    }

    /// Returns true if nothing usable was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse one-indicator-per-line feed content.
///
/// Blank lines and `#` comments are ignored. Lines without a scheme are read
/// as `http://`. A listing with a root path and no query covers the whole
/// host; anything else is matched as an exact URL.
pub fn parse_indicators<I, S>(lines: I) -> ParsedIndicators
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedIndicators::default();

    for line in lines {
        let value = line.as_ref().trim();
        if value.is_empty() || value.starts_with('#') {
            continue;
        }

        let candidate = if has_scheme(value) {
            value.to_string()
        } else {
            format!("http://{value}")
        };

        match NormalizedUrl::parse(&candidate) {
            Ok(url) if url.path() == "/" && url.query().is_none() => {
                parsed.hosts.push(url.host().to_string());
            }
            Ok(url) => parsed.urls.push(url.without_scheme().to_string()),
            Err(_) => parsed.skipped += 1,
        }
    }

    parsed.urls.sort_unstable();
    parsed.urls.dedup();
    parsed.hosts.sort_unstable();
    parsed.hosts.dedup();
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urls_and_hosts() {
        let text = "\
# URLhaus dump
http://1.2.3.4:8080/bins/mozi.m

HTTPS://Evil.Example/login/
badhost.example
ftp://files.example/x
";
        let parsed = parse_indicators(text.lines());
        assert_eq!(
            parsed.urls,
            vec!["1.2.3.4:8080/bins/mozi.m", "evil.example/login"]
        );
        assert_eq!(parsed.hosts, vec!["badhost.example"]);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn duplicates_collapse() {
        let parsed = parse_indicators(["evil.example/a", "http://EVIL.example/a/", "evil.example"]);
        assert_eq!(parsed.urls, vec!["evil.example/a"]);
        assert_eq!(parsed.hosts, vec!["evil.example"]);
    }

    #[test]
    fn embedded_links_do_not_count_as_a_scheme() {
        let parsed = parse_indicators(["evil.example/r?u=https://bank.example"]);
        assert_eq!(parsed.urls, vec!["evil.example/r?u=https://bank.example"]);
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn comments_only_is_empty() {
        assert!(parse_indicators(["# nothing", "   ", ""]).is_empty());
    }
}
