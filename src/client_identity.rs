//! Client identifier extraction for rate limit keys.

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Identifier shared by every request whose origin cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Derive the client identifier from headers and the peer address.
///
/// The first `x-forwarded-for` entry wins, then the connection address, then
/// [`UNKNOWN_CLIENT`]. The forwarded value is trusted as-is, so this is only
/// meaningful behind a proxy that overwrites the header.
pub fn extract_client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    forwarded_client(headers)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Client identifier for an axum request.
pub fn client_id(request: &Request) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    extract_client_id(request.headers(), peer)
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = forwarded.split(',').next()?.trim();

    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}
