use bytes::Bytes;
use headers::ContentType;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::CallError;

/// Represents the body of an HTTP request with its content type.
///
/// A body is either structured JSON, where unset fields are dropped instead of
/// being sent as `null`, or raw bytes sent verbatim with a caller-declared
/// content type.
#[derive(Clone, PartialEq, derive_more::Debug)]
pub struct CallBody {
    pub(crate) content_type: ContentType,
    #[debug(ignore)]
    pub(crate) data: Bytes,
}

impl CallBody {
    /// Creates a JSON body from a serializable type.
    ///
    /// Object fields that serialize to `null` are removed, at any depth.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Encoding`] if the value cannot be serialized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use wirecall_core::CallBody;
    /// # use serde::Serialize;
    /// #[derive(Serialize)]
    /// struct Note {
    ///     name: String,
    ///     description: Option<String>,
    /// }
    ///
    /// let body = CallBody::json(&Note { name: "n1".to_string(), description: None })?;
    /// assert_eq!(body.data(), br#"{"name":"n1"}"#.as_slice());
    /// # Ok::<(), wirecall_core::CallError>(())
    /// ```
    pub fn json<T>(t: &T) -> Result<Self, CallError>
    where
        T: Serialize + ?Sized,
    {
        let mut value = serde_json::to_value(t)
            .map_err(|err| CallError::encoding(format!("failed to serialize JSON body: {err}")))?;
        strip_nulls(&mut value);
        Self::from_value(&value)
    }

    /// Creates a JSON body from a field mapping.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Encoding`] if the mapping cannot be serialized.
    pub fn json_object(object: JsonObject) -> Result<Self, CallError> {
        Self::from_value(&Value::Object(object.fields))
    }

    fn from_value(value: &Value) -> Result<Self, CallError> {
        let data = serde_json::to_vec(value)
            .map_err(|err| CallError::encoding(format!("failed to encode JSON body: {err}")))?;
        Ok(Self {
            content_type: ContentType::json(),
            data: Bytes::from(data),
        })
    }

    /// Creates a raw body with custom content type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use headers::ContentType;
    /// use wirecall_core::CallBody;
    ///
    /// let query = "{ notes { name } }";
    /// let graphql: mime::Mime = "application/graphql".parse().expect("valid mime");
    /// let body = CallBody::raw(query, ContentType::from(graphql));
    /// assert_eq!(body.content_type().to_string(), "application/graphql");
    /// ```
    pub fn raw(data: impl Into<Bytes>, content_type: ContentType) -> Self {
        Self {
            content_type,
            data: data.into(),
        }
    }

    /// Creates a text body with `text/plain` content type.
    pub fn text(text: impl Into<String>) -> Self {
        Self::raw(text.into(), ContentType::text())
    }

    /// Returns the content type.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Returns the encoded bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Removes `null` object members, recursing into objects and arrays.
///
/// `null` array elements are kept: their position is meaningful.
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, member| !member.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Field mapping used to build a JSON body field by field.
///
/// Unset optional fields are skipped entirely.
///
/// ```rust
/// use wirecall_core::{CallBody, JsonObject};
///
/// let object = JsonObject::new()
///     .field("name", "n1")?
///     .optional_field("description", None::<&str>)?
///     .optional_field("shared", Some(true))?;
/// let body = CallBody::json_object(object)?;
///
/// assert_eq!(body.data(), br#"{"name":"n1","shared":true}"#.as_slice());
/// # Ok::<(), wirecall_core::CallError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonObject {
    fields: Map<String, Value>,
}

impl JsonObject {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Encoding`] if the value cannot be serialized.
    pub fn field<T>(mut self, name: impl Into<String>, value: T) -> Result<Self, CallError>
    where
        T: Serialize,
    {
        let name = name.into();
        let mut value = serde_json::to_value(value).map_err(|err| {
            CallError::encoding(format!("failed to serialize field '{name}': {err}"))
        })?;
        strip_nulls(&mut value);
        if !value.is_null() {
            self.fields.insert(name, value);
        }
        Ok(self)
    }

    /// Sets a field only when a value is present.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Encoding`] if the value cannot be serialized.
    pub fn optional_field<T>(
        self,
        name: impl Into<String>,
        value: Option<T>,
    ) -> Result<Self, CallError>
    where
        T: Serialize,
    {
        match value {
            Some(value) => self.field(name, value),
            None => Ok(self),
        }
    }

    /// Checks if no field is set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
