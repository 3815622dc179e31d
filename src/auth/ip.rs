//! Client IP extraction.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

use crate::cli::ClientIpHeader;

/// Extract the client IP address.
///
/// With a configured header (running behind a proxy) the first address in that
/// header is used and there is no fallback to the socket address. Without one,
/// the socket address from `ConnectInfo` is used.
pub fn extract_client_ip(request: &Request, ip_header: Option<&ClientIpHeader>) -> Option<String> {
    match ip_header {
        Some(ip_header) => request
            .headers()
            .get(ip_header.header_name())?
            .to_str()
            .ok()?
            .split(',')
            .next()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string),
        None => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string()),
    }
}
