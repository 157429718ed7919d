//! Refresh token cookie
//!
//! Sign-in sets the refresh token as an HttpOnly cookie scoped to the auth
//! routes; refresh reads it back and logout clears it.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Only the auth routes ever see the refresh token
pub const REFRESH_COOKIE_PATH: &str = "/users/auth";

fn refresh_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, token))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(max_age)
        .build()
}

/// Add the refresh cookie for a freshly issued token
pub fn set_refresh_cookie(jar: CookieJar, token: &str, max_age_secs: i64, secure: bool) -> CookieJar {
    jar.add(refresh_cookie(
        token.to_string(),
        Duration::seconds(max_age_secs.max(0)),
        secure,
    ))
}

/// Add a removal cookie, whether or not the client sent one
pub fn clear_refresh_cookie(jar: CookieJar, secure: bool) -> CookieJar {
    let mut cookie = refresh_cookie(String::new(), Duration::ZERO, secure);
    cookie.make_removal();
    jar.add(cookie)
}

/// Refresh token presented by the client, if any
pub fn refresh_token_from(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    };
    use axum::response::IntoResponse;

    fn set_cookie_header(jar: CookieJar) -> String {
        let response = jar.into_response();
        response.headers()[SET_COOKIE].to_str().unwrap().to_string()
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let jar = set_refresh_cookie(CookieJar::new(), "a.b.c", 604800, false);
        let cookie = jar.get(REFRESH_COOKIE_NAME).unwrap();

        assert_eq!(cookie.value(), "a.b.c");
        assert_eq!(cookie.path(), Some("/users/auth"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(604800)));
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_refresh_cookie_header() {
        let header = set_cookie_header(set_refresh_cookie(CookieJar::new(), "a.b.c", 60, false));

        assert!(header.starts_with("refresh_token=a.b.c;"));
        assert!(header.contains("Path=/users/auth"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Max-Age=60"));
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn test_secure_flag_is_opt_in() {
        let header = set_cookie_header(set_refresh_cookie(CookieJar::new(), "a.b.c", 60, true));
        assert!(header.contains("Secure"));
    }

    #[test]
    fn test_negative_max_age_is_clamped() {
        let jar = set_refresh_cookie(CookieJar::new(), "a.b.c", -30, false);
        assert_eq!(jar.get(REFRESH_COOKIE_NAME).unwrap().max_age(), Some(Duration::ZERO));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let header = set_cookie_header(clear_refresh_cookie(CookieJar::new(), false));

        assert!(header.starts_with("refresh_token=;"));
        assert!(header.contains("Path=/users/auth"));
        assert!(header.contains("Max-Age=0"));
    }

    #[test]
    fn test_refresh_token_is_read_from_jar() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; refresh_token=a.b.c"));
        let jar = CookieJar::from_headers(&headers);

        assert_eq!(refresh_token_from(&jar).as_deref(), Some("a.b.c"));
    }

    #[test]
    fn test_empty_refresh_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("refresh_token="));
        let jar = CookieJar::from_headers(&headers);

        assert_eq!(refresh_token_from(&jar), None);
    }
}
