/// Parameter values extracted from or substituted into paths
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single route parameter value
///
/// Booleans stringify as `true`/`false` when substituted into a path;
/// lists build element-wise (repeated keys in a query string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Str(String),
    List(Vec<String>),
}

/// Route parameters keyed by name
pub type Params = HashMap<String, ParamValue>;

impl ParamValue {
    /// String form used for path substitution and comparisons
    pub fn as_string(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::List(items) => items.join(","),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

/// Convenience constructor for a params map from `(name, value)` pairs
///
/// # Examples
///
/// ```
/// use wayfinder_path::params;
///
/// let p = params([("id", "42"), ("tab", "posts")]);
/// assert_eq!(p["id"].as_string(), "42");
/// ```
pub fn params<'a, I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), ParamValue::from(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_param_value_stringify() {
        assert_eq!(ParamValue::from("abc").as_string(), "abc");
        assert_eq!(ParamValue::Bool(true).as_string(), "true");
        assert_eq!(
            ParamValue::List(vec!["a".into(), "b".into()]).as_string(),
            "a,b"
        );
    }

    #[test]
    fn test_params_helper() {
        let p = params([("a", "1"), ("b", "2")]);
        assert_eq!(p.len(), 2);
        assert_eq!(p["b"], ParamValue::from("2"));
    }
}
