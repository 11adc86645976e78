use std::net::SocketAddr;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use forms::{Cooldown, cooldown::format_stamp};

pub const UNKNOWN_IP: &str = "unknown";

/// Proxy headers first, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

pub fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name).map(|cookie| cookie.value().to_string())
}

/// Restarts the cooldown when the submission completed, otherwise leaves the
/// jar alone.
pub fn stamp_cooldown(
    jar: CookieJar,
    name: &'static str,
    stamp: Option<DateTime<Utc>>,
    cooldown: Cooldown,
    secure: bool,
) -> CookieJar {
    let Some(stamp) = stamp else {
        return jar;
    };

    let cookie = Cookie::build((name, format_stamp(stamp)))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(cooldown.window().num_seconds()));

    jar.add(cookie)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.10:41000".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(client_ip(&headers, peer()), "203.0.113.5");
    }

    #[test]
    fn test_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers, peer()), "198.51.100.2");

        assert_eq!(client_ip(&HeaderMap::new(), peer()), "192.0.2.10");
        assert_eq!(client_ip(&HeaderMap::new(), None), UNKNOWN_IP);
    }

    #[test]
    fn test_blank_forwarded_for_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" , 10.0.0.1"));

        assert_eq!(client_ip(&headers, peer()), "192.0.2.10");
    }

    #[test]
    fn test_stamp_cooldown_cookie_attributes() {
        let stamp = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let jar = stamp_cooldown(
            CookieJar::new(),
            "last_contact_submission",
            Some(stamp),
            Cooldown::default(),
            true,
        );

        let cookie = jar.get("last_contact_submission").unwrap();
        assert_eq!(cookie.value(), "1700000000123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(60)));
    }

    #[test]
    fn test_no_stamp_no_cookie() {
        let jar = stamp_cooldown(CookieJar::new(), "c", None, Cooldown::default(), false);
        assert!(jar.get("c").is_none());
    }
}
