use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use url::Url;

use crate::error::ValidationError;

/// Scheme assumed when the submitted link has none
pub const DEFAULT_SCHEME: &str = "https";

/// Canonical form of a submitted URL.
///
/// Two inputs naming the same resource normalize to the same string, which
/// is used as the cache and deduplication key. Equality and hashing only
/// look at that canonical string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedUrl {
    url: String,
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    had_userinfo: bool,
}

/// Returns true if `raw` starts with `scheme://`.
///
/// A `://` later in the input, say inside a query parameter, does not count.
#[must_use]
pub fn has_scheme(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl NormalizedUrl {
    /// Normalize a raw, user-submitted URL.
    ///
    /// - `https://` is assumed when no scheme is present
    /// - only `http` and `https` are accepted
    /// - host is lower-cased and IDNA encoded, default ports are dropped
    /// - userinfo and fragment are dropped
    /// - a trailing slash on a non-root path is removed
    /// - query parameters are sorted by key, an empty query is removed
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }

        let candidate = if has_scheme(trimmed) {
            trimmed.to_string()
        } else {
            format!("{DEFAULT_SCHEME}://{trimmed}")
        };

        let parsed =
            Url::parse(&candidate).map_err(|e| ValidationError::Malformed(e.to_string()))?;

        let scheme = parsed.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(ValidationError::UnsupportedScheme(scheme));
        }

        let host = parsed
            .host_str()
            .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .ok_or(ValidationError::MissingHost)?;

        let port = parsed.port();
        let path = normalize_path(parsed.path());
        let query = parsed.query().and_then(sort_query);
        let had_userinfo = !parsed.username().is_empty() || parsed.password().is_some();

        let mut url = format!("{scheme}://{host}");
        if let Some(port) = port {
            url.push(':');
            url.push_str(&port.to_string());
        }
        url.push_str(&path);
        if let Some(q) = &query {
            url.push('?');
            url.push_str(q);
        }

        Ok(Self {
            url,
            scheme,
            host,
            port,
            path,
            query,
            had_userinfo,
        })
    }

    /// The canonical URL string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Lower-cased scheme (`http` or `https`)
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Lower-cased, IDNA-encoded host (IPv6 literals keep their brackets)
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host with punycode labels decoded, for showing to people.
    ///
    /// Falls back to [`NormalizedUrl::host`] when the host has no IDN labels
    /// or does not decode cleanly.
    #[must_use]
    pub fn display_host(&self) -> String {
        if !self.host.split('.').any(|label| label.starts_with("xn--")) {
            return self.host.clone();
        }
        match idna::domain_to_unicode(&self.host) {
            (unicode, Ok(())) => unicode,
            (_, Err(_)) => self.host.clone(),
        }
    }

    /// Returns true if the host carries internationalized labels
    #[must_use]
    pub fn is_idn(&self) -> bool {
        self.display_host() != self.host
    }

    /// Explicit non-default port
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    /// Normalized path, always starting with `/`
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sorted query string without the leading `?`
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Whether the raw input carried `user[:password]@` before the host
    #[must_use]
    pub const fn had_userinfo(&self) -> bool {
        self.had_userinfo
    }

    /// Returns true for `https` links
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// Returns true if the host is an IP literal rather than a domain name
    #[must_use]
    pub fn is_ip_host(&self) -> bool {
        self.host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok()
    }

    /// Canonical form without the scheme: `host[:port]/path[?query]`.
    ///
    /// Blocklists often record `http://` links that users later paste
    /// without a scheme, so feed matching uses this key.
    #[must_use]
    pub fn without_scheme(&self) -> &str {
        &self.url[self.scheme.len() + 3..]
    }
}

impl PartialEq for NormalizedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for NormalizedUrl {}

impl Hash for NormalizedUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl std::str::FromStr for NormalizedUrl {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        String::from("/")
    } else {
        trimmed.to_string()
    }
}

/// Sort `&`-separated parameters by key, keeping the relative order of
/// repeated keys. The raw encoding of each parameter is left untouched.
fn sort_query(query: &str) -> Option<String> {
    let mut params: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
    if params.is_empty() {
        return None;
    }
    params.sort_by(|a, b| param_key(a).cmp(param_key(b)));
    Some(params.join("&"))
}

fn param_key(param: &str) -> &str {
    param.split_once('=').map_or(param, |(k, _)| k)
}
