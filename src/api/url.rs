// ABOUTME: Builds the client-facing terminal WebSocket URL behind reverse proxies

use axum::http::header::HOST;
use axum::http::HeaderMap;

const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FALLBACK_HOST: &str = "localhost";

/// `ws[s]://<host>/terminal?token=<token>`
///
/// A configured public URL wins. Otherwise the forwarded headers set by the
/// proxy are used, then `Host`. Default ports for the scheme are dropped.
pub fn terminal_url(headers: &HeaderMap, public_url: Option<&str>, token: &str) -> String {
    let (secure, host) = match public_url {
        Some(public) => from_public_url(public),
        None => from_headers(headers),
    };
    let scheme = if secure { "wss" } else { "ws" };
    let host = strip_default_port(&host, secure);
    format!("{scheme}://{host}/terminal?token={token}")
}

fn from_public_url(public: &str) -> (bool, String) {
    let public = public.trim_end_matches('/');
    let (secure, rest) = if let Some(rest) = public.strip_prefix("https://") {
        (true, rest)
    } else if let Some(rest) = public.strip_prefix("wss://") {
        (true, rest)
    } else if let Some(rest) = public.strip_prefix("http://") {
        (false, rest)
    } else if let Some(rest) = public.strip_prefix("ws://") {
        (false, rest)
    } else {
        (false, public)
    };
    (secure, rest.to_string())
}

fn from_headers(headers: &HeaderMap) -> (bool, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            // Proxies chaining through each other append comma separated values
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let secure = header(FORWARDED_PROTO).is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
    let host = header(FORWARDED_HOST)
        .or_else(|| header(HOST.as_str()))
        .unwrap_or(FALLBACK_HOST);
    (secure, host.to_string())
}

fn strip_default_port(host: &str, secure: bool) -> &str {
    let default_port = if secure { ":443" } else { ":80" };
    host.strip_suffix(default_port).unwrap_or(host)
}
