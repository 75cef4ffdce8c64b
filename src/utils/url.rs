// src/utils/url.rs

//! URL canonicalization and domain helpers.

use url::Url;

/// Builds the dedupe key for article URLs.
///
/// The canonical form lower-cases scheme and host, drops default ports,
/// fragments, trailing slashes and tracking parameters, and sorts what is left
/// of the query string.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl Canonicalizer {
    /// Create a canonicalizer stripping the given parameters.
    ///
    /// Entries ending in `*` strip every parameter with that prefix.
    pub fn new(tracking_params: &[String]) -> Self {
        let mut exact = Vec::new();
        let mut prefixes = Vec::new();
        for param in tracking_params {
            let param = param.trim().to_lowercase();
            match param.strip_suffix('*') {
                Some(prefix) => prefixes.push(prefix.to_string()),
                None => exact.push(param),
            }
        }
        Self { exact, prefixes }
    }

    fn is_tracking(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.exact.iter().any(|p| *p == key) || self.prefixes.iter().any(|p| key.starts_with(p))
    }

    /// Canonical key for `raw`.
    ///
    /// Strings that do not parse as absolute URLs are trimmed and lower-cased.
    ///
    /// # Examples
    /// ```
    /// use cti_queue::utils::url::Canonicalizer;
    ///
    /// let c = Canonicalizer::new(&["utm_*".to_string()]);
    /// assert_eq!(
    ///     c.canonicalize("HTTPS://Example.COM:443/a/?utm_source=x&b=2&a=1#top"),
    ///     "https://example.com/a?a=1&b=2"
    /// );
    /// ```
    pub fn canonicalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let Ok(mut parsed) = Url::parse(trimmed) else {
            return trimmed.trim_end_matches('/').to_lowercase();
        };

        // Url already lower-cases the scheme and host of special schemes and
        // drops their default port.
        parsed.set_fragment(None);

        let mut pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(k, _)| !self.is_tracking(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.sort();

        if pairs.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(pairs.iter());
        }

        let path = parsed.path().trim_end_matches('/').to_string();
        parsed.set_path(&path);

        let mut out = parsed.to_string();
        // An empty path still renders as "/" for hierarchical URLs.
        if parsed.query().is_none() && out.ends_with('/') {
            out.pop();
        }
        out
    }
}

/// Extract the lower-cased host of a URL, without a trailing dot.
///
/// # Examples
/// ```
/// use cti_queue::utils::url::get_domain;
///
/// assert_eq!(
///     get_domain("https://Ubuntu.com/security/notices"),
///     Some("ubuntu.com".to_string())
/// );
/// ```
pub fn get_domain(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_lowercase()))
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon() -> Canonicalizer {
        Canonicalizer::new(&[
            "utm_*".to_string(),
            "fbclid".to_string(),
            "gclid".to_string(),
        ])
    }

    #[test]
    fn test_lowercases_scheme_and_host() {
        assert_eq!(
            canon().canonicalize("HTTPS://WWW.Example.com/Path/Case"),
            "https://www.example.com/Path/Case"
        );
    }

    #[test]
    fn test_strips_default_port() {
        assert_eq!(
            canon().canonicalize("https://example.com:443/x"),
            "https://example.com/x"
        );
        assert_eq!(
            canon().canonicalize("http://example.com:80/x"),
            "http://example.com/x"
        );
        assert_eq!(
            canon().canonicalize("https://example.com:8443/x"),
            "https://example.com:8443/x"
        );
    }

    #[test]
    fn test_strips_trailing_slash() {
        assert_eq!(
            canon().canonicalize("https://example.com/post/"),
            "https://example.com/post"
        );
        assert_eq!(canon().canonicalize("https://example.com/"), "https://example.com");
        assert_eq!(canon().canonicalize("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_strips_tracking_params_and_sorts_rest() {
        assert_eq!(
            canon().canonicalize("https://example.com/a?utm_source=rss&id=7&fbclid=zz&UTM_Medium=x"),
            "https://example.com/a?id=7"
        );
        assert_eq!(
            canon().canonicalize("https://example.com/a?b=2&a=1"),
            canon().canonicalize("https://example.com/a?a=1&b=2")
        );
    }

    #[test]
    fn test_drops_fragment() {
        assert_eq!(
            canon().canonicalize("https://example.com/a#comments"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_unparseable_falls_back() {
        assert_eq!(canon().canonicalize("  Not A URL/ "), "not a url");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let c = canon();
        let once = c.canonicalize("HTTPS://Example.com:443/x/?utm_campaign=a&z=1#f");
        assert_eq!(c.canonicalize(&once), once);
    }

    #[test]
    fn test_get_domain() {
        assert_eq!(
            get_domain("https://sub.example.com:8080/path"),
            Some("sub.example.com".to_string())
        );
        assert_eq!(get_domain("invalid-url"), None);
    }

    #[test]
    fn test_resolve() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve(&base, "page.html"),
            Some("https://example.com/path/page.html".to_string())
        );
        assert_eq!(
            resolve(&base, "/root.html"),
            Some("https://example.com/root.html".to_string())
        );
        assert_eq!(
            resolve(&base, "https://other.example/x"),
            Some("https://other.example/x".to_string())
        );
    }
}
