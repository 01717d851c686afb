use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::request::RequestDescriptor;

/// Errors that can occur while producing credentials.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum AuthenticationError {
    /// A required credential is empty.
    #[display("Missing credential: {name} must not be empty")]
    MissingCredentials {
        /// Name of the empty credential.
        name: &'static str,
    },

    /// Basic authentication username contains invalid characters.
    #[display("Basic auth username contains invalid characters: {message}")]
    InvalidUsername {
        /// Description of the invalid characters or format issue.
        message: String,
    },

    /// The credential value cannot be sent in a header.
    #[display("Credential contains invalid characters: {message}")]
    InvalidCredential {
        /// Description of the invalid characters or format issue.
        message: String,
    },

    /// Token acquisition by the authenticator failed.
    #[display("Token request failed: {message}")]
    TokenRequest {
        /// Description of the failure.
        message: String,
    },
}

/// Secure wrapper for sensitive string data that automatically zeroes memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureString(String);

impl SecureString {
    /// Creates a new secure string from the provided value.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns a reference to the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks if the secret is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Masks sensitive data for display/logging purposes.
    fn mask_sensitive(value: &str) -> String {
        let count = value.chars().count();
        if count <= 8 {
            "***".to_string()
        } else {
            let head: String = value.chars().take(4).collect();
            let tail: String = value.chars().skip(count - 4).collect();
            format!("{head}...{tail}")
        }
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::mask_sensitive(&self.0))
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl Serialize for SecureString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecureString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// A credential attached to an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Sent as a header, replacing any header of the same name.
    Header {
        /// Header name.
        name: String,
        /// Header value.
        value: SecureString,
    },
    /// Appended to the query string.
    Query {
        /// Query parameter name.
        name: String,
        /// Query parameter value.
        value: SecureString,
    },
}

/// Produces the credentials of a request before it is sent.
///
/// Implementations may perform their own network round trip (token exchange)
/// and their own retries; the invoker never retries an authentication failure.
#[async_trait]
pub trait Authenticator: fmt::Debug + Send + Sync {
    /// Returns the credentials to attach to `request`.
    async fn authenticate(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Vec<Credential>, AuthenticationError>;
}

/// Authenticator that sends no credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl Authenticator for NoAuth {
    async fn authenticate(
        &self,
        _request: &RequestDescriptor,
    ) -> Result<Vec<Credential>, AuthenticationError> {
        Ok(Vec::new())
    }
}

/// Where an API key is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyLocation {
    /// In a request header.
    Header,
    /// In a query parameter.
    Query,
}

/// Static credentials.
///
/// # Examples
///
/// ```rust
/// use wirecall_core::{ApiKeyLocation, Authentication};
///
/// let auth = Authentication::Bearer("my-api-token".into());
///
/// let auth = Authentication::Basic {
///     username: "user".to_string(),
///     password: "pass".into(),
/// };
///
/// let auth = Authentication::ApiKey {
///     location: ApiKeyLocation::Header,
///     name: "X-API-Key".to_string(),
///     key: "secret-key".into(),
/// };
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authentication {
    /// Adds `Authorization: Bearer <token>`.
    Bearer(SecureString),

    /// Adds `Authorization: Basic <base64(username:password)>`.
    Basic {
        /// The username for Basic authentication.
        username: String,
        /// The password for Basic authentication.
        password: SecureString,
    },

    /// Adds `<name>: <key>` as a header or a query parameter.
    ApiKey {
        /// Header or query.
        location: ApiKeyLocation,
        /// The header or parameter name.
        name: String,
        /// The API key value.
        key: SecureString,
    },
}

impl Authentication {
    /// Converts the authentication into a credential.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationError` when a credential is empty or cannot be
    /// sent over HTTP.
    pub fn to_credential(&self) -> Result<Credential, AuthenticationError> {
        match self {
            Self::Bearer(token) => {
                if token.is_blank() {
                    return Err(AuthenticationError::MissingCredentials {
                        name: "bearer token",
                    });
                }
                Ok(Credential::Header {
                    name: http::header::AUTHORIZATION.to_string(),
                    value: format!("Bearer {}", token.as_str()).into(),
                })
            }

            Self::Basic { username, password } => {
                if username.trim().is_empty() {
                    return Err(AuthenticationError::MissingCredentials { name: "username" });
                }
                if password.is_blank() {
                    return Err(AuthenticationError::MissingCredentials { name: "password" });
                }
                if username.contains(':') {
                    return Err(AuthenticationError::InvalidUsername {
                        message: "Username cannot contain colon (:) character".to_string(),
                    });
                }

                let credentials_str = format!("{}:{}", username, password.as_str());
                let credentials = base64::engine::general_purpose::STANDARD.encode(credentials_str);
                Ok(Credential::Header {
                    name: http::header::AUTHORIZATION.to_string(),
                    value: format!("Basic {credentials}").into(),
                })
            }

            Self::ApiKey {
                location,
                name,
                key,
            } => {
                if key.is_blank() {
                    return Err(AuthenticationError::MissingCredentials { name: "API key" });
                }
                let name = name.clone();
                let value = key.clone();
                Ok(match location {
                    ApiKeyLocation::Header => Credential::Header { name, value },
                    ApiKeyLocation::Query => Credential::Query { name, value },
                })
            }
        }
    }
}

#[async_trait]
impl Authenticator for Authentication {
    async fn authenticate(
        &self,
        _request: &RequestDescriptor,
    ) -> Result<Vec<Credential>, AuthenticationError> {
        let credential = self.to_credential()?;
        if let Credential::Header { value, .. } = &credential {
            http::HeaderValue::from_str(value.as_str()).map_err(|err| {
                AuthenticationError::InvalidCredential {
                    message: err.to_string(),
                }
            })?;
        }
        Ok(vec![credential])
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::ApiKey { location, name, .. } => f
                .debug_struct("ApiKey")
                .field("location", location)
                .field("name", name)
                .field("key", &"[REDACTED]")
                .finish(),
        }
    }
}

impl fmt::Display for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(token) => write!(f, "Bearer {token}"),
            Self::Basic { username, .. } => write!(f, "Basic (username: {username})"),
            Self::ApiKey { name, key, .. } => write!(f, "ApiKey ({name}: {key})"),
        }
    }
}
