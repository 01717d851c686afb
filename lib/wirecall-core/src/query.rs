use std::fmt::Display;

use crate::CallError;

/// Ordered query parameters of a call.
///
/// Each addition appends a value, so a name may appear several times.
/// Unset optional values are never added.
///
/// # Examples
///
/// ```rust
/// use wirecall_core::CallQuery;
///
/// let query = CallQuery::new()
///     .add_param("page_size", 2)
///     .add_optional_param("provider_id", None::<String>)
///     .add_optional_param("page_token", Some("tok"));
///
/// assert_eq!(query.to_query_string()?, "page_size=2&page_token=tok");
/// # Ok::<(), wirecall_core::CallError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallQuery {
    params: Vec<(String, String)>,
}

impl CallQuery {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter using the value's natural string form.
    pub fn add_param(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// Appends a parameter only when a value is present.
    pub fn add_optional_param<T: Display>(
        self,
        name: impl Into<String>,
        value: Option<T>,
    ) -> Self {
        match value {
            Some(value) => self.add_param(name, value),
            None => self,
        }
    }

    /// Returns the first value of a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Checks if the query is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of parameter values.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Serializes the parameters as an `application/x-www-form-urlencoded` string.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Encoding`] if the serializer rejects the parameters.
    pub fn to_query_string(&self) -> Result<String, CallError> {
        serde_urlencoded::to_string(&self.params)
            .map_err(|err| CallError::encoding(format!("failed to encode query string: {err}")))
    }
}

impl<K, V> FromIterator<(K, V)> for CallQuery
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let params = iter
            .into_iter()
            .map(|(name, value)| (name.into(), value.to_string()))
            .collect();
        Self { params }
    }
}
