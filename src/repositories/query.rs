use serde::Serialize;
use serde_json::Value;

/// A document query predicate, encoded the way the BaaS expects in
/// `queries[]` parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub(crate) method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) attribute: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) values: Vec<Value>,
}

impl Query {
    pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
        Self {
            method: "equal",
            attribute: Some(attribute.to_string()),
            values: vec![value.into()],
        }
    }

    /// Full-text search; needs a full-text index on the attribute.
    pub fn search(attribute: &str, text: &str) -> Self {
        Self {
            method: "search",
            attribute: Some(attribute.to_string()),
            values: vec![Value::String(text.to_string())],
        }
    }

    pub fn limit(limit: u32) -> Self {
        Self {
            method: "limit",
            attribute: None,
            values: vec![Value::from(limit)],
        }
    }

    pub fn to_param(&self) -> String {
        // Serializing a struct of strings and JSON values cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
