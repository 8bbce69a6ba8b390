//! Query string dictionary for GET and POST parameters.
//!
//! [`QueryDict`] is a multi-value dictionary: each key maps to the list of
//! values submitted under it, and [`QueryDict::get`] returns the last one,
//! like Django's `QueryDict`.

use std::collections::BTreeMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

/// A multi-value dictionary for query string and form data.
///
/// # Examples
///
/// ```
/// use helpful_http::QueryDict;
///
/// let qd = QueryDict::parse("color=red&color=blue&size=large");
/// assert_eq!(qd.get("color"), Some("blue"));
/// assert_eq!(qd.get_list("color").unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    data: BTreeMap<String, Vec<String>>,
}

impl QueryDict {
    /// Creates a new, empty `QueryDict`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a URL-encoded string (`key1=val1&key2=val2`).
    ///
    /// `+` decodes to a space and percent escapes are decoded lossily.
    pub fn parse(query_string: &str) -> Self {
        let mut qd = Self::new();
        for pair in query_string.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            qd.append(&decode(key), &decode(value));
        }
        qd
    }

    /// Builds a `QueryDict` from key/value pairs.
    pub fn from_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Self {
        let mut qd = Self::new();
        for (k, v) in pairs {
            qd.append(k.as_ref(), v.as_ref());
        }
        qd
    }

    /// Returns the last value for the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Returns all values for the given key.
    pub fn get_list(&self, key: &str) -> Option<&Vec<String>> {
        self.data.get(key)
    }

    /// Replaces all values for `key` with `value`.
    pub fn set(&mut self, key: &str, value: &str) {
        self.data.insert(key.to_string(), vec![value.to_string()]);
    }

    /// Appends a value to the list for `key`.
    pub fn append(&mut self, key: &str, value: &str) {
        self.data
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// Encodes this dictionary as a URL query string, sorted by key.
    pub fn urlencode(&self) -> String {
        let mut parts = Vec::new();
        for (key, values) in &self.data {
            for value in values {
                parts.push(format!(
                    "{}={}",
                    utf8_percent_encode(key, NON_ALPHANUMERIC),
                    utf8_percent_encode(value, NON_ALPHANUMERIC)
                ));
            }
        }
        parts.join("&")
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }
}

fn decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let qd = QueryDict::parse("a=1&b=2");
        assert_eq!(qd.get("a"), Some("1"));
        assert_eq!(qd.get("b"), Some("2"));
        assert_eq!(qd.len(), 2);
    }

    #[test]
    fn test_parse_multi_value() {
        let qd = QueryDict::parse("tag=a&tag=b");
        assert_eq!(qd.get("tag"), Some("b"));
        assert_eq!(
            qd.get_list("tag"),
            Some(&vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_parse_encoded() {
        let qd = QueryDict::parse("name=John+Doe&city=New%20York&key");
        assert_eq!(qd.get("name"), Some("John Doe"));
        assert_eq!(qd.get("city"), Some("New York"));
        assert_eq!(qd.get("key"), Some(""));
    }

    #[test]
    fn test_parse_empty() {
        assert!(QueryDict::parse("").is_empty());
        assert!(QueryDict::parse("&&").is_empty());
    }

    #[test]
    fn test_set_and_append() {
        let mut qd = QueryDict::from_pairs(&[("a", "1")]);
        qd.append("a", "2");
        assert_eq!(qd.get_list("a").unwrap().len(), 2);
        qd.set("a", "3");
        assert_eq!(qd.get_list("a"), Some(&vec!["3".to_string()]));
    }

    #[test]
    fn test_urlencode() {
        let qd = QueryDict::from_pairs(&[("q", "a b"), ("o", "title")]);
        assert_eq!(qd.urlencode(), "o=title&q=a%20b");
    }
}
