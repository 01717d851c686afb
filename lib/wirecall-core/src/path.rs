use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use url::Url;

use crate::CallError;

/// Regular expression for matching path placeholders in the format `{param_name}`.
static RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?<name>\w+)}").expect("a valid regex"));

/// Everything but the RFC 3986 unreserved characters is escaped inside a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_path_param_value(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// A route pattern with ordered placeholders.
///
/// Placeholders use the `{name}` syntax. Names only document the route: values
/// are substituted positionally, in declaration order.
///
/// # Examples
///
/// ```rust
/// use wirecall_core::PathTemplate;
///
/// let template = PathTemplate::new("/v1/{account_id}/providers/{provider_id}/notes/{note_id}");
/// let path = template.resolve(&["a1", "p1", "n 1"])?;
///
/// assert_eq!(path, "/v1/a1/providers/p1/notes/n%201");
/// # Ok::<(), wirecall_core::CallError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{pattern}")]
pub struct PathTemplate {
    pattern: String,
    names: Vec<String>,
}

impl PathTemplate {
    /// Parses a route pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let names = RE
            .captures_iter(&pattern)
            .filter_map(|caps| caps.name("name"))
            .map(|name| name.as_str().to_string())
            .collect();
        Self { pattern, names }
    }

    /// The raw pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Substitutes `params` in order, percent-escaping reserved characters.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Validation`] when the number of parameters does not
    /// match the number of placeholders, or when a parameter is empty.
    pub fn resolve<S: AsRef<str>>(&self, params: &[S]) -> Result<String, CallError> {
        if params.len() != self.names.len() {
            return Err(CallError::validation(format!(
                "path '{}' expects {} parameter(s), got {}",
                self.pattern,
                self.names.len(),
                params.len()
            )));
        }

        // One more literal than placeholders, possibly empty
        let mut literals = RE.split(&self.pattern);
        let mut resolved = String::with_capacity(self.pattern.len());
        resolved.extend(literals.next());
        for ((name, value), literal) in self.names.iter().zip(params).zip(literals) {
            let value = value.as_ref();
            if value.is_empty() {
                return Err(CallError::validation(format!(
                    "path parameter '{name}' must not be empty"
                )));
            }
            resolved.push_str(&encode_path_param_value(value));
            resolved.push_str(literal);
        }

        Ok(resolved)
    }

    /// Resolves the template and joins it to `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::MalformedUrl`] when the combined URL does not parse,
    /// and the errors of [`resolve`](Self::resolve).
    pub fn resolve_url<S: AsRef<str>>(
        &self,
        base_url: &str,
        params: &[S],
    ) -> Result<Url, CallError> {
        let path = self.resolve(params)?;
        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.parse::<Url>()
            .map_err(|error| CallError::MalformedUrl { url, error })
    }
}

impl From<&str> for PathTemplate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PathTemplate {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
