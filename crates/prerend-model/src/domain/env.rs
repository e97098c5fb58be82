use serde::{Deserialize, Serialize};

use crate::KeyValue;

/// Environment overrides applied to a spawned command.
///
/// Stored as an ordered list so configuration files stay readable; lookups
/// scan from the end, which gives "last assignment wins" semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Env(Vec<KeyValue>);

impl Env {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Value of the last assignment to `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|kv| kv.key() == key)
            .map(|kv| kv.value())
    }

    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(KeyValue::new(key, value));
    }

    /// Builder-style [`Env::push`].
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.push(key, value);
        self
    }

    /// Concatenate `other` after `self`; entries from `other` take precedence.
    pub fn merged(&self, other: &Env) -> Env {
        let mut out = self.0.clone();
        out.extend(other.0.iter().cloned());
        Env(out)
    }

    /// Final value per key, in first-seen key order.
    pub fn resolved(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = Vec::with_capacity(self.0.len());
        for kv in &self.0 {
            match out.iter_mut().find(|(k, _)| *k == kv.key()) {
                Some(slot) => slot.1 = kv.value(),
                None => out.push((kv.key(), kv.value())),
            }
        }
        out
    }
}

impl FromIterator<(String, String)> for Env {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| KeyValue::new(k, v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::Env;

    #[test]
    fn later_assignment_wins() {
        let env = Env::new()
            .with("NODE_ENV", "development")
            .with("PORT", "8000")
            .with("NODE_ENV", "production");

        assert_eq!(env.get("NODE_ENV"), Some("production"));
        assert_eq!(env.get("PORT"), Some("8000"));
        assert!(env.get("HOME").is_none());
    }

    #[test]
    fn merged_overrides_base() {
        let base = Env::new().with("NODE_ENV", "development").with("A", "1");
        let overrides = Env::new().with("NODE_ENV", "production");

        let merged = base.merged(&overrides);
        assert_eq!(merged.get("NODE_ENV"), Some("production"));
        assert_eq!(merged.get("A"), Some("1"));
        assert_eq!(base.get("NODE_ENV"), Some("development"));
    }

    #[test]
    fn resolved_collapses_duplicates_in_first_seen_order() {
        let env = Env::new().with("B", "1").with("A", "2").with("B", "3");
        assert_eq!(env.resolved(), vec![("B", "3"), ("A", "2")]);
    }

    #[test]
    fn deserializes_from_plain_array() {
        let json = r#"[{"key":"IS_SERVERLESS","value":"true"}]"#;
        let env: Env = serde_json::from_str(json).unwrap();
        assert_eq!(env.get("IS_SERVERLESS"), Some("true"));
    }
}
