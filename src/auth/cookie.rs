//! Cookie parsing and `Set-Cookie` construction.

use axum::http::{HeaderMap, header};

/// Cookie holding the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}

/// `Set-Cookie` value carrying a refresh token.
pub fn refresh_token_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        REFRESH_COOKIE_NAME,
        token,
        max_age_secs,
        secure_attr(secure)
    )
}

/// `Set-Cookie` value that clears `name`: empty value, `Max-Age=0`.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{}",
        name,
        secure_attr(secure)
    )
}

/// Cookie name of a `Set-Cookie` header value.
pub fn set_cookie_name(set_cookie: &str) -> Option<&str> {
    set_cookie
        .split_once('=')
        .map(|(name, _)| name.trim())
        .filter(|name| !name.is_empty())
}

fn secure_attr(secure: bool) -> &'static str {
    if secure { "; Secure" } else { "" }
}
