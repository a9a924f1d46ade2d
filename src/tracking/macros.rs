//! Macro handling for tracker URLs

use std::sync::OnceLock;

use regex::Regex;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"^\s*(?:%%[A-Za-z0-9_]+%%|\$\{[A-Za-z0-9_]+\}|\[[A-Za-z0-9_]+\]|\{\{?[A-Za-z0-9_]+\}?\})")
            .expect("placeholder pattern is valid")
    })
}

/// Whether an exchange-provided value was left unexpanded by the ad server
pub fn is_unresolved(value: &str) -> bool {
    value.trim().is_empty() || placeholder().is_match(value)
}

/// Replace every occurrence of `token` with the epoch milliseconds `now_ms`
pub fn substitute_timestamp(url: &str, token: &str, now_ms: f64) -> String {
    if token.is_empty() {
        return url.to_string();
    }
    url.replace(token, &format!("{}", now_ms.max(0.0).trunc() as u64))
}

/// `application/x-www-form-urlencoded` encoding of a single value
pub fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_placeholders() {
        assert!(is_unresolved(""));
        assert!(is_unresolved("%%CLICK_URL_UNESC%%"));
        assert!(is_unresolved("%%CLICK_URL_UNESC%%https://dest.example.com"));
        assert!(is_unresolved("${CLICK_URL}"));
        assert!(is_unresolved("[gclick]"));
        assert!(is_unresolved("{{CLICK}}"));
        assert!(!is_unresolved("https://adclick.example.net/pcs/click?xai=abc"));
    }

    #[test]
    fn test_timestamp_substitution() {
        assert_eq!(
            substitute_timestamp("https://t.example.com/p?cb=[timestamp]", "[timestamp]", 1700000000123.7),
            "https://t.example.com/p?cb=1700000000123"
        );
        assert_eq!(substitute_timestamp("https://t.example.com/p", "", 5.0), "https://t.example.com/p");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("a b&c=d"), "a+b%26c%3Dd");
    }
}
