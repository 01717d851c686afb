use std::str::FromStr;
use std::time::Duration;

use crate::auth::{ApiKeyLocation, Authentication};
use crate::{CallError, InvokerBuilder, RetryPolicy};

const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";
const NO_AUTH: &str = "noauth";

/// Invalid service configuration.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum ConfigError {
    /// A variable required by the selected auth type is not set.
    #[display("missing environment variable '{name}'")]
    MissingVariable {
        /// The variable name.
        name: String,
    },

    /// A variable holds a value that cannot be used.
    #[display("invalid value '{value}' for '{name}': {message}")]
    InvalidValue {
        /// The variable name.
        name: String,
        /// The value found.
        value: String,
        /// What is expected.
        message: String,
    },
}

/// Service settings resolved from `<NAME>_*` environment variables.
///
/// | Variable | Meaning |
/// |----------|---------|
/// | `<NAME>_URL` | base URL |
/// | `<NAME>_AUTH_TYPE` | `noauth` (default), `bearertoken`, `basic` or `apikey` |
/// | `<NAME>_BEARER_TOKEN` | token for `bearertoken` |
/// | `<NAME>_USERNAME`, `<NAME>_PASSWORD` | credentials for `basic` |
/// | `<NAME>_APIKEY` | key for `apikey` |
/// | `<NAME>_APIKEY_NAME` | header or parameter name, `X-API-Key` by default |
/// | `<NAME>_APIKEY_LOCATION` | `header` (default) or `query` |
/// | `<NAME>_ENABLE_RETRIES` | `true` enables retries |
/// | `<NAME>_MAX_RETRIES` | retries after the first attempt |
/// | `<NAME>_RETRY_INTERVAL` | maximum delay between attempts, in seconds |
///
/// `<NAME>` is the service name upper-cased with `-` replaced by `_`.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    service_name: String,
    service_url: Option<String>,
    authentication: Option<Authentication>,
    retry: Option<RetryPolicy>,
}

impl ServiceConfig {
    /// Reads the configuration of `service_name` from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn from_env(service_name: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(service_name, |name| std::env::var(name).ok())
    }

    /// Reads the configuration of `service_name` through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn from_lookup(
        service_name: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let vars = Vars::new(service_name, lookup);

        let service_url = vars.get("URL");
        let authentication = vars.authentication()?;
        let retry = vars.retry()?;

        Ok(Self {
            service_name: service_name.to_string(),
            service_url,
            authentication,
            retry,
        })
    }

    /// The service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The configured base URL.
    pub fn service_url(&self) -> Option<&str> {
        self.service_url.as_deref()
    }

    /// The configured credentials, `None` for `noauth`.
    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    /// The retry policy, `None` when retries are disabled.
    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// Applies these settings to an invoker builder.
    ///
    /// # Errors
    ///
    /// [`CallError::MalformedUrl`] when the configured URL does not parse.
    pub fn apply(self, builder: InvokerBuilder) -> Result<InvokerBuilder, CallError> {
        let mut builder = match &self.service_url {
            Some(url) => builder.with_service_url(url)?,
            None => builder,
        };
        if let Some(authentication) = self.authentication {
            builder = builder.with_authenticator(authentication);
        }
        if let Some(retry) = self.retry {
            builder = builder.with_retries(retry);
        }
        Ok(builder)
    }
}

struct Vars<F> {
    prefix: String,
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(service_name: &str, lookup: F) -> Self {
        let prefix = service_name.to_ascii_uppercase().replace('-', "_");
        Self { prefix, lookup }
    }

    fn name(&self, key: &str) -> String {
        format!("{}_{key}", self.prefix)
    }

    fn get(&self, key: &str) -> Option<String> {
        let value = (self.lookup)(&self.name(key));
        value.filter(|value| !value.trim().is_empty())
    }

    fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingVariable {
            name: self.name(key),
        })
    }

    fn parse<T: FromStr>(&self, key: &str, expected: &str) -> Result<Option<T>, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(self.invalid(key, value, expected)),
        }
    }

    fn invalid(&self, key: &str, value: String, message: &str) -> ConfigError {
        ConfigError::InvalidValue {
            name: self.name(key),
            value,
            message: message.to_string(),
        }
    }

    fn api_key_location(&self) -> Result<ApiKeyLocation, ConfigError> {
        let Some(location) = self.get("APIKEY_LOCATION") else {
            return Ok(ApiKeyLocation::Header);
        };
        match location.to_ascii_lowercase().as_str() {
            "header" => Ok(ApiKeyLocation::Header),
            "query" => Ok(ApiKeyLocation::Query),
            _ => {
                let expected = "expected 'header' or 'query'";
                Err(self.invalid("APIKEY_LOCATION", location, expected))
            }
        }
    }

    fn authentication(&self) -> Result<Option<Authentication>, ConfigError> {
        let auth_type = self.get("AUTH_TYPE").unwrap_or_else(|| NO_AUTH.to_string());
        let authentication = match auth_type.to_ascii_lowercase().as_str() {
            NO_AUTH => None,
            "bearertoken" => Some(Authentication::Bearer(self.require("BEARER_TOKEN")?.into())),
            "basic" => Some(Authentication::Basic {
                username: self.require("USERNAME")?,
                password: self.require("PASSWORD")?.into(),
            }),
            "apikey" => Some(Authentication::ApiKey {
                location: self.api_key_location()?,
                name: self
                    .get("APIKEY_NAME")
                    .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
                key: self.require("APIKEY")?.into(),
            }),
            _ => {
                return Err(self.invalid(
                    "AUTH_TYPE",
                    auth_type,
                    "expected 'noauth', 'bearertoken', 'basic' or 'apikey'",
                ));
            }
        };
        Ok(authentication)
    }

    fn retry(&self) -> Result<Option<RetryPolicy>, ConfigError> {
        let enabled = self.parse::<bool>("ENABLE_RETRIES", "expected 'true' or 'false'")?;
        if enabled != Some(true) {
            return Ok(None);
        }

        let mut policy = RetryPolicy::default();
        let retries = self.parse::<usize>("MAX_RETRIES", "expected a number of retries")?;
        if let Some(retries) = retries {
            policy = policy.with_max_attempts(retries.saturating_add(1));
        }
        let seconds = self.parse::<u64>("RETRY_INTERVAL", "expected a number of seconds")?;
        if let Some(seconds) = seconds {
            policy = policy.with_max_interval(Duration::from_secs(seconds));
        }
        Ok(Some(policy))
    }
}
