use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Canonicalized request header set.
///
/// Names are trimmed and lower-cased and entries are kept sorted, so two
/// callers supplying the same headers in a different order or casing produce
/// the same cache and backoff key. Entries with a blank name are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderSet(BTreeMap<String, String>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.insert(name.as_ref(), value.as_ref());
        }
        headers
    }

    /// Parses a `Name: value` line, as typed on a command line.
    pub fn parse_line(raw: &str) -> Result<(String, String), ValidationError> {
        let (name, value) = raw.split_once(':').ok_or_else(|| ValidationError::InvalidHeader {
            raw: raw.to_owned(),
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::InvalidHeader {
                raw: raw.to_owned(),
            });
        }
        Ok((name.to_owned(), value.trim().to_owned()))
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.0.insert(name.to_ascii_lowercase(), value.trim().to_owned());
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.trim().to_ascii_lowercase()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object form used by the relay's `headers` query parameter.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_and_case_do_not_change_identity() {
        let a = HeaderSet::from_pairs([("X-Api-Key", "k"), ("Accept", "application/json")]);
        let b = HeaderSet::from_pairs([("accept", "application/json"), ("x-api-key", " k ")]);

        assert_eq!(a, b);
        assert_eq!(a.get("X-API-KEY"), Some("k"));
    }

    #[test]
    fn blank_names_are_dropped() {
        let headers = HeaderSet::new().with("  ", "ignored").with("Authorization", "Bearer t");

        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn parse_line_splits_on_first_colon() {
        assert_eq!(
            HeaderSet::parse_line("Authorization: Bearer a:b"),
            Ok((String::from("Authorization"), String::from("Bearer a:b")))
        );
        assert!(HeaderSet::parse_line("no-colon").is_err());
        assert!(HeaderSet::parse_line(": value").is_err());
    }

    #[test]
    fn json_form_is_sorted_object() {
        let headers = HeaderSet::from_pairs([("b", "2"), ("a", "1")]);

        assert_eq!(headers.to_json().expect("serializes"), r#"{"a":"1","b":"2"}"#);
    }
}
