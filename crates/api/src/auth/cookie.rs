//! The `access_token` cookie that lets browser clients authenticate
//! without attaching a bearer header.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// `Set-Cookie` value carrying a fresh access token.
pub fn access_token_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{ACCESS_TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the access token cookie.
pub fn clear_access_token_cookie(secure: bool) -> String {
    access_token_cookie("", 0, secure)
}

/// Read the access token from the request's `Cookie` headers.
pub fn access_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn cookie_attributes() {
        let cookie = access_token_cookie("abc", 900, true);
        assert!(cookie.starts_with("access_token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=900"));
        assert!(cookie.ends_with("; Secure"));
        assert!(!access_token_cookie("abc", 900, false).contains("Secure"));
    }

    #[test]
    fn extracts_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; access_token=tok.en.value; lang=es"),
        );
        assert_eq!(access_token_from_headers(&headers), Some("tok.en.value"));
    }

    #[test]
    fn cleared_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("access_token="));
        assert_eq!(access_token_from_headers(&headers), None);
    }
}
