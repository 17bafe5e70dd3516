//! Query string encoding in the bracket array format Canvas expects.
//!
//! Scalars become `key=value`; lists become one `key[]=value` pair per element.

use std::fmt::Display;
use url::form_urlencoded::byte_serialize;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Encoded as `key=value`.
    Scalar(String),
    /// Encoded as `key[]=v1&key[]=v2`. An empty list is omitted.
    List(Vec<String>),
}

/// Ordered query parameters.
///
/// Parameters are encoded in insertion order.
///
/// # Examples
///
/// ```
/// use canvas_api::QueryParams;
///
/// let params = QueryParams::new()
///     .param("per_page", 100)
///     .list("enrollment_role_id", [3, 10]);
///
/// assert_eq!(
///     params.encode(),
///     "per_page=100&enrollment_role_id[]=3&enrollment_role_id[]=10"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scalar parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.entries
            .push((key.into(), QueryValue::Scalar(value.to_string())));
        self
    }

    /// Appends a list parameter.
    pub fn list<I>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.entries.push((key.into(), QueryValue::List(values)));
        self
    }

    /// Returns `true` if no parameter has been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encodes the parameters. See [`encode_query`].
    pub fn encode(&self) -> String {
        encode_query(self)
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Scalar(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::List(values)
    }
}

/// Encodes parameters into a query string without the leading `?`.
///
/// Keys and values are percent-encoded; the `[]` suffix of list keys is kept
/// literal. An empty parameter set encodes to the empty string.
///
/// ```
/// use canvas_api::{encode_query, QueryParams};
///
/// assert_eq!(encode_query(&QueryParams::new().list("role", [3, 10])), "role[]=3&role[]=10");
/// assert_eq!(encode_query(&QueryParams::new()), "");
/// assert_eq!(encode_query(&QueryParams::new().list("role", Vec::<u32>::new())), "");
/// ```
pub fn encode_query(params: &QueryParams) -> String {
    let mut pairs = Vec::new();

    for (key, value) in &params.entries {
        let key = encode_component(key);
        match value {
            QueryValue::Scalar(v) => pairs.push(format!("{key}={}", encode_component(v))),
            QueryValue::List(values) => {
                for v in values {
                    pairs.push(format!("{key}[]={}", encode_component(v)));
                }
            }
        }
    }

    pairs.join("&")
}

fn encode_component(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_parameters() {
        let params = QueryParams::new().param("page", 1).param("id", "2");
        assert_eq!(encode_query(&params), "page=1&id=2");
    }

    #[test]
    fn test_single_parameter() {
        assert_eq!(encode_query(&QueryParams::new().param("id", 3)), "id=3");
    }

    #[test]
    fn test_array_parameters() {
        let params = QueryParams::new().list("role", [3, 10]);
        assert_eq!(encode_query(&params), "role[]=3&role[]=10");
    }

    #[test]
    fn test_arrays_mixing_numbers_and_strings() {
        let params = QueryParams::new().list("role", ["3".to_string(), 10.to_string()]);
        assert_eq!(encode_query(&params), "role[]=3&role[]=10");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(encode_query(&QueryParams::new()), "");
        assert_eq!(
            encode_query(&QueryParams::new().list("role", Vec::<String>::new())),
            ""
        );
    }

    #[test]
    fn test_order_follows_insertion() {
        let params = QueryParams::new()
            .param("z", 1)
            .list("include", ["term", "teachers"])
            .param("a", 2);
        assert_eq!(
            encode_query(&params),
            "z=1&include[]=term&include[]=teachers&a=2"
        );
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let params = QueryParams::new().param("search_term", "rust & c");
        assert_eq!(encode_query(&params), "search_term=rust+%26+c");
    }

    #[test]
    fn test_from_iterator() {
        let params: QueryParams = vec![
            ("state", QueryValue::from("available")),
            ("include", QueryValue::from(vec!["term".to_string()])),
        ]
        .into_iter()
        .collect();
        assert_eq!(encode_query(&params), "state=available&include[]=term");
    }
}
