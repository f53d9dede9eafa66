use percent_encoding::percent_decode_str;

pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

pub trait TokenProvider: Send + Sync {
    /// Value of the named entry in the ambient store, if any.
    fn token(&self, name: &str) -> Option<String>;

    /// Raw `Cookie` header to forward with every request.
    fn cookie_header(&self) -> Option<String> {
        None
    }
}

/// Ambient cookie storage, held as the `name=value; name=value` string a
/// browser would expose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieStore {
    raw: String,
}

impl CookieStore {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn get_token(&self, name: &str) -> Option<String> {
        get_token(&self.raw, name)
    }
}

impl TokenProvider for CookieStore {
    fn token(&self, name: &str) -> Option<String> {
        self.get_token(name)
    }

    fn cookie_header(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.raw.trim().to_string())
        }
    }
}

pub fn get_token(cookies: &str, name: &str) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|entry| entry.strip_prefix(name)?.strip_prefix('='))
        .map(|value| percent_decode_str(value).decode_utf8_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_token() {
        assert_eq!(get_token("", "csrftoken"), None);
        assert!(CookieStore::default().is_empty());
        assert_eq!(CookieStore::default().cookie_header(), None);
    }

    #[test]
    fn finds_trimmed_entry() {
        let store = CookieStore::new("sessionid=abc;  csrftoken=tok123 ; theme=dark");
        assert_eq!(store.token("csrftoken").as_deref(), Some("tok123"));
        assert_eq!(store.token("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn key_must_match_exactly() {
        let cookies = "csrftokenx=wrong; xcsrftoken=wrong";
        assert_eq!(get_token(cookies, "csrftoken"), None);
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(
            get_token("csrftoken=one; csrftoken=two", "csrftoken").as_deref(),
            Some("one")
        );
    }

    #[test]
    fn value_is_percent_decoded() {
        assert_eq!(
            get_token("csrftoken=a%20b%3Dc", "csrftoken").as_deref(),
            Some("a b=c")
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(
            get_token("csrftoken=%FF", "csrftoken").as_deref(),
            Some("\u{FFFD}")
        );
        assert_eq!(
            get_token("csrftoken=ok%C3", "csrftoken").as_deref(),
            Some("ok\u{FFFD}")
        );
    }

    #[test]
    fn empty_value_is_present() {
        assert_eq!(get_token("csrftoken=", "csrftoken").as_deref(), Some(""));
    }
}
