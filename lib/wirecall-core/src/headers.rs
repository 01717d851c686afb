use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use crate::CallError;

/// Represents HTTP headers for a call.
///
/// Values accumulate: adding a header twice sends both values. Names are
/// compared case-insensitively. Names and values are validated when the
/// request is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallHeaders {
    headers: Vec<(String, String)>,
}

impl CallHeaders {
    /// Creates a new empty `CallHeaders` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use wirecall_core::CallHeaders;
    ///
    /// let headers = CallHeaders::new()
    ///     .add_header("Accept", "application/json")
    ///     .add_header("Transaction-Id", "abc-123-def");
    /// assert_eq!(headers.len(), 2);
    /// ```
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends a header value only when present.
    pub fn add_optional_header(
        self,
        name: impl Into<String>,
        value: Option<impl Into<String>>,
    ) -> Self {
        match value {
            Some(value) => self.add_header(name, value),
            None => self,
        }
    }

    /// Merges another `CallHeaders` instance into this one.
    ///
    /// Every name present in `other` replaces all values of that name in `self`.
    pub fn merge(mut self, other: Self) -> Self {
        self.headers.retain(|(name, _)| {
            !other
                .headers
                .iter()
                .any(|(other_name, _)| other_name.eq_ignore_ascii_case(name))
        });
        self.headers.extend(other.headers);
        self
    }

    /// Returns the values of a header, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Checks if the headers collection is empty.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns the number of header values.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Converts headers to an [`HeaderMap`], keeping every value.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Encoding`] for invalid header names or values.
    pub fn to_header_map(&self) -> Result<HeaderMap, CallError> {
        let mut result = HeaderMap::with_capacity(self.headers.len());

        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                CallError::encoding(format!("invalid header name '{name}': {err}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|err| {
                CallError::encoding(format!("invalid value for header '{name}': {err}"))
            })?;
            result.append(header_name, header_value);
        }

        Ok(result)
    }
}

impl<K, V> FromIterator<(K, V)> for CallHeaders
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let headers = iter
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self { headers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_empty_headers() {
        let headers = CallHeaders::new();

        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn should_accumulate_values_with_same_name() {
        let headers = CallHeaders::new()
            .add_header("Accept", "application/json")
            .add_header("accept", "text/plain");

        let map = headers.to_header_map().expect("valid headers");
        let values: Vec<_> = map.get_all("accept").iter().collect();

        assert_eq!(values, ["application/json", "text/plain"]);
    }

    #[test]
    fn should_let_merged_headers_take_precedence() {
        let defaults = CallHeaders::new()
            .add_header("User-Agent", "wirecall/0.1.0")
            .add_header("X-Service-Name", "findings");
        let caller = CallHeaders::new().add_header("user-agent", "my-app/2.0");

        let merged = defaults.merge(caller);

        let user_agents: Vec<_> = merged.get_all("User-Agent").collect();
        let service_names: Vec<_> = merged.get_all("X-Service-Name").collect();
        assert_eq!(user_agents, ["my-app/2.0"]);
        assert_eq!(service_names, ["findings"]);
    }

    #[test]
    fn should_collect_pairs_in_order() {
        let headers: CallHeaders = [("Accept", "application/json"), ("X-Trace", "t-1")]
            .into_iter()
            .collect();

        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(pairs, [("Accept", "application/json"), ("X-Trace", "t-1")]);
    }

    #[test]
    fn should_skip_unset_optional_header() {
        let headers = CallHeaders::new()
            .add_optional_header("Transaction-Id", None::<String>)
            .add_optional_header("X-Trace", Some("t-1"));

        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn should_reject_invalid_header_name() {
        let headers = CallHeaders::new().add_header("Invalid Header", "value");

        let result = headers.to_header_map();

        assert!(matches!(result, Err(CallError::Encoding { .. })));
    }

    #[test]
    fn should_reject_invalid_header_value() {
        let headers = CallHeaders::new().add_header("X-Test", "line\nbreak");

        let result = headers.to_header_map();

        assert!(matches!(result, Err(CallError::Encoding { .. })));
    }
}
