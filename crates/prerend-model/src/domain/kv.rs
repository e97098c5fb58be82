use serde::{Deserialize, Serialize};

/// Single environment variable assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValue {
    key: String,
    value: String,
}

impl KeyValue {
    /// Create a new assignment.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl From<(&str, &str)> for KeyValue {
    fn from((key, value): (&str, &str)) -> Self {
        Self::new(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::KeyValue;

    #[test]
    fn tuple_conversion_keeps_both_parts() {
        let kv: KeyValue = ("NODE_ENV", "production").into();
        assert_eq!(kv.key(), "NODE_ENV");
        assert_eq!(kv.value(), "production");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_string(&KeyValue::new("PORT", "8000")).unwrap();
        assert_eq!(json, r#"{"key":"PORT","value":"8000"}"#);
    }
}
