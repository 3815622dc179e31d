//! Paths that bypass the security chain.
//!
//! Patterns are Ant-style: `**` matches any number of whole segments
//! (including none), `*` matches within a single segment.

/// Exempt endpoints and static asset locations of the market backend.
pub const DEFAULT_EXEMPT_PATTERNS: &[&str] = &[
    "/",
    "/api/user/**",
    "/static/**",
    "/api/carts/**",
    "/api/items/**",
    "/api/payment/token",
    "/api/stores/**",
    "/api/event/**",
    "/img/**",
    // Common static resource locations
    "/css/**",
    "/js/**",
    "/images/**",
    "/webjars/**",
    "/favicon.*",
    "/*/icon-*",
];

#[derive(Debug, Clone)]
pub struct PathPolicy {
    exempt: Vec<String>,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXEMPT_PATTERNS.iter().copied())
    }
}

impl PathPolicy {
    pub fn new<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            exempt: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `path` skips authentication entirely.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt.iter().any(|pattern| path_matches(pattern, path))
    }
}

/// Match a request path against an Ant-style pattern.
pub fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = segments(pattern).collect();
    let path: Vec<&str> = segments(path).collect();
    match_segments(&pattern, &path)
}

fn segments(s: &str) -> impl Iterator<Item = &str> {
    s.split('/').filter(|seg| !seg.is_empty())
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((seg, rest)) => match path.split_first() {
            Some((first, path_rest)) => {
                match_segment(seg.as_bytes(), first.as_bytes()) && match_segments(rest, path_rest)
            }
            None => false,
        },
    }
}

/// `*` wildcard match within one segment.
fn match_segment(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&b'*', rest)) => (0..=text.len()).any(|skip| match_segment(rest, &text[skip..])),
        Some((c, rest)) => match text.split_first() {
            Some((t, text_rest)) => c == t && match_segment(rest, text_rest),
            None => false,
        },
    }
}
