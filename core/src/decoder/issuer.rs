//! Issuer recognition
//!
//! An issuer code is either an http(s) URL whose host is one of the
//! issuer's registered domains (or a subdomain of one), or a string that
//! starts with one of the issuer's prefix tokens followed by the separator,
//! e.g. `SYN-TRACK1-SERIAL9`.

use serde::{Deserialize, Serialize};
use url::Url;

use super::parse_http_url;

/// Query parameters checked, in this order, for a tracking id
pub const TRACKING_ID_PARAMS: [&str; 5] = ["id", "trackingId", "tracking_id", "code", "productId"];

/// Domains and prefix tokens that identify the issuer's own codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerProfile {
    /// Registered domains; subdomains match too
    pub domains: Vec<String>,
    /// Prefix tokens for non-URL codes (without the separator)
    pub prefixes: Vec<String>,
    pub separator: char,
}

impl Default for IssuerProfile {
    fn default() -> Self {
        Self {
            domains: vec!["syngenta.com".to_string()],
            prefixes: vec!["SYN".to_string()],
            separator: '-',
        }
    }
}

/// Identifiers extracted from an issuer code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerMatch {
    pub tracking_id: String,
    pub serial_number: Option<String>,
}

impl IssuerProfile {
    pub fn new(domains: Vec<String>, prefixes: Vec<String>, separator: char) -> Self {
        Self {
            domains,
            prefixes,
            separator,
        }
    }

    /// Host equals a registered domain or is a subdomain of one
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.domains.iter().any(|domain| {
            let domain = domain.trim_start_matches('.').to_ascii_lowercase();
            !domain.is_empty()
                && (host == domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|rest| rest.ends_with('.')))
        })
    }

    /// Recognize an issuer code and extract its tracking id
    ///
    /// Returns `None` when the code does not belong to this issuer.
    pub fn match_code(&self, code: &str) -> Option<IssuerMatch> {
        if let Some(url) = parse_http_url(code) {
            let host = url.host_str()?;
            if !self.matches_host(host) {
                return None;
            }
            return Some(IssuerMatch {
                tracking_id: tracking_id_from_url(&url).unwrap_or_else(|| code.to_string()),
                serial_number: None,
            });
        }

        let tail = self.strip_prefix_token(code)?;
        if tail.is_empty() {
            return Some(IssuerMatch {
                tracking_id: code.to_string(),
                serial_number: None,
            });
        }
        let serial_number = tail
            .rsplit(self.separator)
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);
        Some(IssuerMatch {
            tracking_id: tail.to_string(),
            serial_number,
        })
    }

    fn strip_prefix_token<'a>(&self, code: &'a str) -> Option<&'a str> {
        self.prefixes.iter().find_map(|prefix| {
            code.strip_prefix(prefix.as_str())?
                .strip_prefix(self.separator)
        })
    }
}

/// First non-empty well-known query parameter, else the last non-empty
/// path segment
pub fn tracking_id_from_url(url: &Url) -> Option<String> {
    for name in TRACKING_ID_PARAMS {
        let value = url
            .query_pairs()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned());
        if value.is_some() {
            return value;
        }
    }

    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> IssuerProfile {
        IssuerProfile::default()
    }

    #[test]
    fn test_host_matching() {
        let p = profile();
        assert!(p.matches_host("syngenta.com"));
        assert!(p.matches_host("attx.syngenta.com"));
        assert!(p.matches_host("ATTX.Syngenta.COM."));
        assert!(!p.matches_host("notsyngenta.com"));
        assert!(!p.matches_host("syngenta.com.evil.net"));
        assert!(!p.matches_host("example.com"));
    }

    #[test]
    fn test_query_param_priority() {
        let found = profile()
            .match_code("https://syngenta.com/p?code=C1&trackingId=T1&id=")
            .unwrap();
        assert_eq!(found.tracking_id, "T1");
    }

    #[test]
    fn test_path_segment_fallback() {
        let found = profile()
            .match_code("https://attx.syngenta.com/product/ABC123/")
            .unwrap();
        assert_eq!(found.tracking_id, "ABC123");
    }

    #[test]
    fn test_bare_domain_falls_back_to_whole_url() {
        let found = profile().match_code("https://syngenta.com/").unwrap();
        assert_eq!(found.tracking_id, "https://syngenta.com/");
    }

    #[test]
    fn test_foreign_url_is_not_an_issuer_code() {
        assert!(profile().match_code("https://example.com/product?id=1").is_none());
        assert!(profile().match_code("https://example.com/syngenta").is_none());
    }

    #[test]
    fn test_prefix_token() {
        let found = profile().match_code("SYN-ABC").unwrap();
        assert_eq!(found.tracking_id, "ABC");
        assert_eq!(found.serial_number.as_deref(), Some("ABC"));

        assert!(profile().match_code("SYNABC").is_none());
        assert!(profile().match_code("XSYN-ABC").is_none());
    }

    #[test]
    fn test_custom_profile() {
        let p = IssuerProfile::new(vec!["acme.test".into()], vec!["AC".into()], '_');
        assert_eq!(p.match_code("AC_42_7").unwrap().tracking_id, "42_7");
        assert!(p.match_code("SYN-1").is_none());
        assert_eq!(
            p.match_code("http://scan.acme.test/u?productId=P9")
                .unwrap()
                .tracking_id,
            "P9"
        );
    }
}
