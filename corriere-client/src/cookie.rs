// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Cookies received through `Set-Cookie`, and the jar keeping them between
//! requests.
//!
//! # References
//! * [RFC 6265 HTTP State Management Mechanism](https://www.rfc-editor.org/rfc/rfc6265.html)

use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use corriere_http::Uri;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ClientError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: Option<SystemTime>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,

    /// Only sent to the exact host in `domain`, since the `Set-Cookie` line
    /// carried no `Domain` attribute.
    #[serde(default)]
    pub host_only: bool,
}

impl Cookie {
    /// Parses a `Set-Cookie` line, e.g. `id=a3fWa; Expires=Thu, 21 Oct 2021
    /// 07:28:00 GMT; Secure; HttpOnly`. Unknown attributes are ignored.
    #[must_use]
    pub fn parse(line: &str) -> Option<Cookie> {
        let mut parts = line.split(';');

        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie {
            name: name.to_owned(),
            value: value.trim().trim_matches('"').to_owned(),
            expires: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            same_site: None,
            host_only: false,
        };

        let mut max_age = None;
        for attribute in parts {
            let (key, value) = match attribute.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (attribute.trim(), ""),
            };

            match key.to_ascii_lowercase().as_str() {
                "expires" => cookie.expires = httpdate::parse_http_date(value).ok(),
                "max-age" => max_age = value.parse::<i64>().ok(),
                "domain" => cookie.domain = Some(value.trim_start_matches('.').to_ascii_lowercase()),
                "path" => cookie.path = Some(value.to_owned()),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "samesite" => cookie.same_site = Some(value.to_owned()),
                _ => (),
            }
        }

        // Max-Age takes precedence over Expires.
        if let Some(seconds) = max_age {
            // An expiry beyond what the clock can represent never expires.
            cookie.expires = match u64::try_from(seconds) {
                Ok(seconds) => SystemTime::now().checked_add(Duration::from_secs(seconds)),
                Err(..) => Some(SystemTime::UNIX_EPOCH),
            };
        }

        Some(cookie)
    }

    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Binds the cookie to the URI of the request it was received for. A
    /// missing domain becomes the request host and a missing path its
    /// directory. Returns `false` when the `Domain` attribute names another
    /// site.
    pub fn scope_to(&mut self, uri: &Uri) -> bool {
        if let Some(domain) = &self.domain {
            if !domain_matches(uri.host(), domain) {
                return false;
            }
        } else {
            self.domain = Some(uri.host().to_owned());
            self.host_only = true;
        }

        if !self.path.as_deref().is_some_and(|path| path.starts_with('/')) {
            self.path = Some(default_path(uri.path()).to_owned());
        }

        true
    }

    /// Whether the cookie should be sent with a request to `uri`. Unscoped
    /// attributes match everything.
    #[must_use]
    pub fn matches(&self, uri: &Uri) -> bool {
        if self.secure && uri.scheme() != "https" {
            return false;
        }

        let domain_ok = match &self.domain {
            Some(domain) if self.host_only => uri.host() == domain,
            Some(domain) => domain_matches(uri.host(), domain),
            None => true,
        };

        domain_ok && self.path.as_deref().map_or(true, |path| path_matches(uri.path(), path))
    }

    fn key(&self) -> CookieKey {
        (self.name.clone(), self.domain.clone(), self.path.clone())
    }
}

/// RFC 6265 section 5.1.3.
fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host.strip_suffix(domain).is_some_and(|prefix| prefix.ends_with('.'))
}

/// RFC 6265 section 5.1.4.
fn default_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    let request_path = if request_path.is_empty() { "/" } else { request_path };
    match request_path.strip_prefix(cookie_path) {
        Some(rest) => rest.is_empty() || cookie_path.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// Cookies are told apart by name, domain and path.
type CookieKey = (String, Option<String>, Option<String>);

/// The cookies of a client, by name. A jar opened from a file is saved back
/// to that file.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    cookies: IndexMap<CookieKey, Cookie>,
    path: Option<PathBuf>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the jar stored at `path`, or starts an empty one when the file
    /// doesn't exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let mut jar = CookieJar { cookies: IndexMap::new(), path: Some(path.clone()) };

        if !path.exists() {
            return Ok(jar);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|source| ClientError::ReadFile { path: path.clone(), source })?;

        let now = SystemTime::now();
        let cookies: Vec<Cookie> = serde_json::from_str(&content)?;
        for cookie in cookies.into_iter().filter(|cookie| !cookie.is_expired(now)) {
            jar.cookies.insert(cookie.key(), cookie);
        }

        info!(path = %path.display(), count = jar.cookies.len(), "loaded cookie jar");
        Ok(jar)
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn cookies(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }

    /// The first stored cookie called `name`, whatever its domain.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.values().find(|cookie| cookie.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Stores the cookie of a `Set-Cookie` line. A cookie that is already
    /// expired removes the stored one. Returns `false` when the line can't be
    /// parsed.
    ///
    /// Attributes the line doesn't carry stay unscoped. Use
    /// [`set_cookie_from`](Self::set_cookie_from) for lines received in a
    /// response.
    pub fn set_cookie(&mut self, line: &str) -> bool {
        let Some(cookie) = Cookie::parse(line) else {
            warn!(line, "skipping malformed Set-Cookie");
            return false;
        };

        self.store(cookie);
        true
    }

    pub fn set_cookies<I, S>(&mut self, lines: I)
            where I: IntoIterator<Item = S>,
                  S: AsRef<str> {
        for line in lines {
            self.set_cookie(line.as_ref());
        }
    }

    /// Stores the cookie of a `Set-Cookie` line received for a request to
    /// `uri`. Returns `false` when the line can't be parsed or its `Domain`
    /// names another site.
    pub fn set_cookie_from(&mut self, uri: &Uri, line: &str) -> bool {
        let Some(mut cookie) = Cookie::parse(line) else {
            warn!(line, "skipping malformed Set-Cookie");
            return false;
        };

        if !cookie.scope_to(uri) {
            warn!(line, host = uri.host(), "skipping Set-Cookie for a foreign domain");
            return false;
        }

        self.store(cookie);
        true
    }

    pub fn set_cookies_from<I, S>(&mut self, uri: &Uri, lines: I)
            where I: IntoIterator<Item = S>,
                  S: AsRef<str> {
        for line in lines {
            self.set_cookie_from(uri, line.as_ref());
        }
    }

    fn store(&mut self, cookie: Cookie) {
        if cookie.is_expired(SystemTime::now()) {
            debug!(name = %cookie.name, "removing expired cookie");
            self.cookies.shift_remove(&cookie.key());
        } else {
            self.cookies.insert(cookie.key(), cookie);
        }
    }

    /// The value of the `Cookie` header for a request to `uri`, e.g.
    /// `a=1; b=2`, or `None` when no live cookie applies.
    #[must_use]
    pub fn header_line(&self, uri: &Uri) -> Option<String> {
        let now = SystemTime::now();
        let line = self.cookies.values()
            .filter(|cookie| !cookie.is_expired(now) && cookie.matches(uri))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ");

        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }

    /// Writes the jar to the file it was opened from. A jar without a file
    /// isn't saved.
    pub fn save(&self) -> Result<(), ClientError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let cookies: Vec<&Cookie> = self.cookies.values().collect();
        let content = serde_json::to_string_pretty(&cookies)?;
        std::fs::write(path, content)
            .map_err(|source| ClientError::WriteFile { path: path.clone(), source })?;

        info!(path = %path.display(), count = cookies.len(), "saved cookie jar");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_attributes() {
        let cookie = Cookie::parse("id=a3fWa; Expires=Wed, 21 Oct 2065 07:28:00 GMT; Domain=.Example.com; Path=/docs; Secure; HttpOnly; SameSite=Lax").unwrap();
        assert_eq!(cookie.name, "id");
        assert_eq!(cookie.value, "a3fWa");
        assert_eq!(cookie.expires, Some(httpdate::parse_http_date("Wed, 21 Oct 2065 07:28:00 GMT").unwrap()));
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.path.as_deref(), Some("/docs"));
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("Lax"));
    }

    #[rstest]
    #[case("")]
    #[case("novalue")]
    #[case("=value")]
    #[case("; Secure")]
    fn test_parse_malformed(#[case] line: &str) {
        assert_eq!(Cookie::parse(line), None);
    }

    #[test]
    fn test_max_age_overrides_expires() {
        let cookie = Cookie::parse("a=1; Max-Age=0; Expires=Wed, 21 Oct 2065 07:28:00 GMT").unwrap();
        assert!(cookie.is_expired(SystemTime::now()));
    }

    #[rstest]
    #[case("a=1; Max-Age=9223372036854775807")]
    #[case("a=1; Max-Age=18446744073709551")]
    fn test_huge_max_age_never_expires(#[case] line: &str) {
        let cookie = Cookie::parse(line).unwrap();
        assert!(!cookie.is_expired(SystemTime::now()));
    }

    fn uri(text: &str) -> Uri {
        Uri::parse(text).unwrap()
    }

    #[test]
    fn test_jar() {
        let any = uri("http://a.com/");
        let mut jar = CookieJar::new();
        jar.set_cookies(["a=1", "b=2", "broken"]);
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.cookie("b").map(|cookie| cookie.value.as_str()), Some("2"));
        assert_eq!(jar.header_line(&any).as_deref(), Some("a=1; b=2"));

        jar.set_cookie("a=3");
        assert_eq!(jar.header_line(&any).as_deref(), Some("a=3; b=2"));

        jar.set_cookie("a=gone; Max-Age=-1");
        assert!(jar.cookie("a").is_none());
        assert_eq!(jar.header_line(&any).as_deref(), Some("b=2"));
    }

    #[test]
    fn test_empty_jar_has_no_header() {
        assert_eq!(CookieJar::new().header_line(&uri("http://a.com/")), None);
    }

    #[test]
    fn test_host_only_cookie_stays_on_its_host() {
        let mut jar = CookieJar::new();
        jar.set_cookies_from(&uri("http://a.com/login"), ["session=abc"]);

        let cookie = jar.cookie("session").unwrap();
        assert!(cookie.host_only);
        assert_eq!(cookie.domain.as_deref(), Some("a.com"));
        assert_eq!(cookie.path.as_deref(), Some("/"));

        assert_eq!(jar.header_line(&uri("http://a.com/x")).as_deref(), Some("session=abc"));
        assert_eq!(jar.header_line(&uri("http://b.com/x")), None);
        assert_eq!(jar.header_line(&uri("http://www.a.com/x")), None);
    }

    #[rstest]
    #[case("http://example.com/", true)]
    #[case("http://www.example.com/", true)]
    #[case("http://badexample.com/", false)]
    #[case("http://example.org/", false)]
    fn test_domain_cookie(#[case] target: &str, #[case] expected: bool) {
        let mut jar = CookieJar::new();
        assert!(jar.set_cookie_from(&uri("http://www.example.com/"), "id=1; Domain=.example.com"));
        assert_eq!(jar.header_line(&uri(target)).is_some(), expected);
    }

    #[test]
    fn test_foreign_domain_is_rejected() {
        let mut jar = CookieJar::new();
        assert!(!jar.set_cookie_from(&uri("http://a.com/"), "id=1; Domain=b.com"));
        assert!(jar.is_empty());
    }

    #[rstest]
    #[case("/docs", true)]
    #[case("/docs/", true)]
    #[case("/docs/web", true)]
    #[case("/docsets", false)]
    #[case("/", false)]
    fn test_path_matching(#[case] path: &str, #[case] expected: bool) {
        let mut jar = CookieJar::new();
        jar.set_cookie_from(&uri("http://a.com/"), "id=1; Path=/docs");
        let target = uri("http://a.com/").with_path(path).unwrap();
        assert_eq!(jar.header_line(&target).is_some(), expected);
    }

    #[test]
    fn test_default_path_is_the_request_directory() {
        let mut jar = CookieJar::new();
        jar.set_cookie_from(&uri("http://a.com/account/login"), "id=1");
        assert_eq!(jar.cookie("id").unwrap().path.as_deref(), Some("/account"));
        assert!(jar.header_line(&uri("http://a.com/account/settings")).is_some());
        assert!(jar.header_line(&uri("http://a.com/other")).is_none());
    }

    #[test]
    fn test_secure_cookie_needs_https() {
        let mut jar = CookieJar::new();
        jar.set_cookie_from(&uri("https://a.com/"), "id=1; Secure");
        assert!(jar.header_line(&uri("https://a.com/")).is_some());
        assert!(jar.header_line(&uri("http://a.com/")).is_none());
    }

    #[test]
    fn test_same_name_on_different_hosts() {
        let mut jar = CookieJar::new();
        jar.set_cookie_from(&uri("http://a.com/"), "session=a");
        jar.set_cookie_from(&uri("http://b.com/"), "session=b");
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.header_line(&uri("http://a.com/")).as_deref(), Some("session=a"));
        assert_eq!(jar.header_line(&uri("http://b.com/")).as_deref(), Some("session=b"));
    }

    #[test]
    fn test_save_and_open() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("cookies.json");

        let mut jar = CookieJar::open(&path).unwrap();
        assert!(jar.is_empty());
        jar.set_cookies(["session=abc; HttpOnly", "theme=dark"]);
        jar.save().unwrap();

        let reopened = CookieJar::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.cookie("session").unwrap().http_only);
        assert_eq!(reopened.path(), Some(path.as_path()));
    }

    #[test]
    fn test_open_corrupt_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("cookies.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(CookieJar::open(&path).unwrap_err(), ClientError::CookieFile(..)));
    }
}
