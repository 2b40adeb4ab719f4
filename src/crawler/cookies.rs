//! Netscape cookies.txt loading
//!
//! Browser export extensions write this tab-separated format; loading it lets
//! a crawl reuse a session that already passed an anti-bot challenge.

use reqwest::cookie::Jar;
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One cookie line from a cookies.txt file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetscapeCookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub name: String,
    pub value: String,
}

impl NetscapeCookie {
    /// `Set-Cookie` style string accepted by `Jar::add_cookie_str`
    pub fn to_set_cookie(&self) -> String {
        let mut cookie = format!(
            "{}={}; Domain={}; Path={}",
            self.name, self.value, self.domain, self.path
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie
    }

    /// URL the cookie is scoped to, used as the jar's origin
    pub fn origin(&self) -> Option<Url> {
        let host = self.domain.trim_start_matches('.');
        let scheme = if self.secure { "https" } else { "http" };
        Url::parse(&format!("{}://{}{}", scheme, host, self.path)).ok()
    }
}

/// Parses cookies.txt content; malformed lines are skipped
///
/// Expiry is ignored so exported session cookies stay usable.
pub fn parse_netscape_cookies(content: &str) -> Vec<NetscapeCookie> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim_end_matches(['\r', '\n']);
            let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
                Some(rest) => (rest, true),
                None => (line, false),
            };
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                return None;
            }

            Some(NetscapeCookie {
                domain: fields[0].to_string(),
                path: if fields[2].is_empty() { "/" } else { fields[2] }.to_string(),
                secure: fields[3].eq_ignore_ascii_case("TRUE"),
                http_only,
                name: fields[5].to_string(),
                value: fields[6].to_string(),
            })
        })
        .collect()
}

/// Builds a cookie jar, seeded from a cookies.txt file when one is given
///
/// A missing or unreadable file leaves the jar empty; the crawl proceeds
/// without the stored session.
pub fn load_cookie_jar(path: Option<&Path>) -> Jar {
    let jar = Jar::default();
    let Some(path) = path else {
        return jar;
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Cookie file {} not loaded: {}", path.display(), e);
            return jar;
        }
    };

    let mut loaded = 0usize;
    for cookie in parse_netscape_cookies(&content) {
        if let Some(origin) = cookie.origin() {
            jar.add_cookie_str(&cookie.to_set_cookie(), &origin);
            loaded += 1;
        }
    }
    debug!("Loaded {} cookies from {}", loaded, path.display());

    jar
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    const COOKIES_TXT: &str = "# Netscape HTTP Cookie File\n\
        \n\
        .twinset.ru\tTRUE\t/\tTRUE\t0\tsession\tabc123\n\
        #HttpOnly_www.twinset.com\tFALSE\t/row\tTRUE\t1999999999\tcf_clearance\txyz\n\
        broken line without tabs\n";

    #[test]
    fn test_parse_cookie_lines() {
        let cookies = parse_netscape_cookies(COOKIES_TXT);
        assert_eq!(cookies.len(), 2);

        assert_eq!(cookies[0].domain, ".twinset.ru");
        assert_eq!(cookies[0].name, "session");
        assert!(cookies[0].secure);
        assert!(!cookies[0].http_only);

        assert_eq!(cookies[1].domain, "www.twinset.com");
        assert_eq!(cookies[1].path, "/row");
        assert!(cookies[1].http_only);
    }

    #[test]
    fn test_set_cookie_string() {
        let cookies = parse_netscape_cookies(COOKIES_TXT);
        assert_eq!(
            cookies[1].to_set_cookie(),
            "cf_clearance=xyz; Domain=www.twinset.com; Path=/row; Secure; HttpOnly"
        );
        assert_eq!(
            cookies[0].origin().unwrap().as_str(),
            "https://twinset.ru/"
        );
    }

    #[test]
    fn test_jar_sends_loaded_cookie() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, COOKIES_TXT.as_bytes()).unwrap();

        let jar = load_cookie_jar(Some(file.path()));
        let url = Url::parse("https://twinset.ru/catalog/").unwrap();
        let header = jar.cookies(&url).unwrap();
        assert_eq!(header.to_str().unwrap(), "session=abc123");
    }

    #[test]
    fn test_missing_file_gives_empty_jar() {
        let jar = load_cookie_jar(Some(Path::new("/nonexistent/cookies.txt")));
        let url = Url::parse("https://twinset.ru/").unwrap();
        assert!(jar.cookies(&url).is_none());
    }
}
