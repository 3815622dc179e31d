//! Bearer token extraction.

use axum::http::{HeaderMap, header};

use super::cookie::{REFRESH_COOKIE_NAME, get_cookie};

/// Scheme prefixes accepted in front of a token. Cookie values cannot hold a
/// space, so clients that store `Bearer <token>` in a cookie URL-encode it.
const SCHEME_PREFIXES: [&str; 2] = ["Bearer ", "Bearer%20"];

/// Where a token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Header,
    Cookie,
}

/// A raw token as presented by the client, scheme prefix still attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedToken {
    pub raw: String,
    pub source: TokenSource,
}

impl PresentedToken {
    /// Token value with any scheme prefix removed.
    pub fn value(&self) -> &str {
        strip_scheme(&self.raw)
    }
}

/// Find the bearer token: `Authorization` header first, then the refresh-token cookie.
/// Blank values count as absent. A header with another scheme (`Basic ...`)
/// is ignored so it cannot shadow the cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<PresentedToken> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| has_bearer_scheme(v) && !strip_scheme(v).is_empty())
        .map(|raw| PresentedToken {
            raw: raw.to_string(),
            source: TokenSource::Header,
        });

    from_header.or_else(|| {
        get_cookie(headers, REFRESH_COOKIE_NAME)
            .filter(|v| !v.is_empty())
            .map(|raw| PresentedToken {
                raw: raw.to_string(),
                source: TokenSource::Cookie,
            })
    })
}

fn has_bearer_scheme(raw: &str) -> bool {
    SCHEME_PREFIXES.iter().any(|prefix| raw.starts_with(prefix))
}

/// Remove a leading `Bearer ` (or `Bearer%20`) scheme.
pub fn strip_scheme(raw: &str) -> &str {
    let raw = raw.trim_start();
    SCHEME_PREFIXES
        .iter()
        .find_map(|prefix| raw.strip_prefix(prefix))
        .unwrap_or(raw)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("Bearer abc.def"), "abc.def");
        assert_eq!(strip_scheme("Bearer%20abc.def"), "abc.def");
        assert_eq!(strip_scheme("abc.def"), "abc.def");
        assert_eq!(strip_scheme("  Bearer   abc  "), "abc");
        assert_eq!(strip_scheme("Bearer "), "");
    }

    #[test]
    fn test_header_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer h"));
        headers.insert(header::COOKIE, HeaderValue::from_static("refreshToken=c"));

        let token = extract_token(&headers).unwrap();
        assert_eq!(token.source, TokenSource::Header);
        assert_eq!(token.value(), "h");
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("refreshToken=Bearer%20c"),
        );

        let token = extract_token(&headers).unwrap();
        assert_eq!(token.source, TokenSource::Cookie);
        assert_eq!(token.value(), "c");
    }

    #[test]
    fn test_other_scheme_falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic YWxpY2U6c2VjcmV0"),
        );
        headers.insert(header::COOKIE, HeaderValue::from_static("refreshToken=c"));

        let token = extract_token(&headers).unwrap();
        assert_eq!(token.source, TokenSource::Cookie);
        assert_eq!(token.value(), "c");

        headers.remove(header::COOKIE);
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_bare_header_token_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("abc.def"));

        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        headers.insert(header::COOKIE, HeaderValue::from_static("refreshToken="));

        assert_eq!(extract_token(&headers), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
