//! Decoding of fields whose shape depends on a discriminator property.
//!
//! A variant field is modelled as one Rust enum with one struct per
//! alternative. The enum owns a static [`VariantRegistry`] mapping each
//! discriminator value to the decoder of its alternative, and implements
//! `Deserialize` through [`deserialize_variant`]:
//!
//! ```rust
//! use std::sync::LazyLock;
//!
//! use serde::{Deserialize, Deserializer, Serialize};
//! use wirecall_core::{VariantRegistry, VariantSet, deserialize_variant};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Circle {
//!     kind: String,
//!     radius: f64,
//! }
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Square {
//!     kind: String,
//!     side: f64,
//! }
//!
//! #[derive(Debug, Serialize)]
//! #[serde(untagged)]
//! enum Shape {
//!     Circle(Circle),
//!     Square(Square),
//! }
//!
//! static SHAPES: LazyLock<VariantRegistry<Shape>> = LazyLock::new(|| {
//!     VariantRegistry::builder("kind")
//!         .alternative(&["CIRCLE"], Shape::Circle)
//!         .alternative(&["SQUARE", "BOX"], Shape::Square)
//!         .build()
//!         .expect("disjoint discriminators")
//! });
//!
//! impl VariantSet for Shape {
//!     fn registry() -> &'static VariantRegistry<Self> {
//!         &SHAPES
//!     }
//! }
//!
//! impl<'de> Deserialize<'de> for Shape {
//!     fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
//!         deserialize_variant(Self::registry(), deserializer)
//!     }
//! }
//!
//! let shape: Shape = serde_json::from_str(r#"{"kind":"BOX","side":2.0}"#)?;
//! assert!(matches!(shape, Shape::Square(_)));
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::cell::RefCell;
use std::fmt;

use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

type DecodeFn<T> = Box<dyn Fn(Value) -> Result<T, String> + Send + Sync>;

thread_local! {
    // Message of the last unknown discriminator reported on this thread
    static DISCRIMINATOR_MISS: RefCell<Option<String>> = const { RefCell::new(None) };
}

pub(crate) fn clear_discriminator_miss() {
    DISCRIMINATOR_MISS.set(None);
}

pub(crate) fn take_discriminator_miss() -> Option<String> {
    DISCRIMINATOR_MISS.take()
}

/// Two alternatives of a registry claim the same discriminator value.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
#[display("discriminator value '{value}' of property '{discriminator}' is claimed twice")]
pub struct OverlappingDiscriminator {
    /// The discriminator property.
    pub discriminator: &'static str,
    /// The value claimed twice.
    pub value: &'static str,
}

/// Failure to decode a variant value.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum VariantError {
    /// The value is not an object or has no discriminator property.
    #[display("missing discriminator property '{discriminator}'")]
    MissingDiscriminator {
        /// The discriminator property.
        discriminator: &'static str,
    },

    /// The discriminator matches no alternative.
    #[display("unknown variant '{value}' for property '{discriminator}'")]
    UnknownDiscriminator {
        /// The discriminator property.
        discriminator: &'static str,
        /// The observed value.
        value: String,
    },

    /// The alternative was selected but its fields do not match.
    #[display("{message}")]
    InvalidAlternative {
        /// Decoder message, followed by the path inside the alternative.
        message: String,
    },
}

/// Maps discriminator values to the decoder of their alternative.
///
/// Matching of discriminator values is case-sensitive. Each value belongs to
/// at most one alternative, which [`VariantRegistryBuilder::build`] enforces.
pub struct VariantRegistry<T> {
    discriminator: &'static str,
    values: Vec<&'static str>,
    index: IndexMap<&'static str, usize>,
    decoders: Vec<DecodeFn<T>>,
}

impl<T> fmt::Debug for VariantRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantRegistry")
            .field("discriminator", &self.discriminator)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl<T> VariantRegistry<T> {
    /// Starts a registry dispatching on the `discriminator` property.
    pub fn builder(discriminator: &'static str) -> VariantRegistryBuilder<T> {
        VariantRegistryBuilder {
            discriminator,
            alternatives: Vec::new(),
        }
    }

    /// The discriminator property name.
    pub fn discriminator(&self) -> &'static str {
        self.discriminator
    }

    /// Every known discriminator value, in registration order.
    pub fn values(&self) -> &[&'static str] {
        &self.values
    }

    /// Decodes `value` into the alternative named by its discriminator.
    ///
    /// # Errors
    ///
    /// See [`VariantError`].
    pub fn decode(&self, value: Value) -> Result<T, VariantError> {
        let discriminator = self.discriminator;
        let kind = match value.get(discriminator) {
            Some(Value::String(kind)) => kind.as_str(),
            Some(Value::Null) | None => {
                return Err(VariantError::MissingDiscriminator { discriminator });
            }
            Some(other) => {
                return Err(VariantError::UnknownDiscriminator {
                    discriminator,
                    value: other.to_string(),
                });
            }
        };

        let Some(decode) = self
            .index
            .get(kind)
            .and_then(|&position| self.decoders.get(position))
        else {
            return Err(VariantError::UnknownDiscriminator {
                discriminator,
                value: kind.to_string(),
            });
        };
        decode(value).map_err(|message| VariantError::InvalidAlternative { message })
    }
}

/// Builder of [`VariantRegistry`].
pub struct VariantRegistryBuilder<T> {
    discriminator: &'static str,
    alternatives: Vec<(&'static [&'static str], DecodeFn<T>)>,
}

impl<T> fmt::Debug for VariantRegistryBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantRegistryBuilder")
            .field("discriminator", &self.discriminator)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> VariantRegistryBuilder<T> {
    /// Registers an alternative decoded as `A` then wrapped by `wrap`.
    pub fn alternative<A, F>(mut self, values: &'static [&'static str], wrap: F) -> Self
    where
        A: DeserializeOwned + 'static,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        let decode = move |value: Value| {
            serde_path_to_error::deserialize::<_, A>(value)
                .map(&wrap)
                .map_err(|err| {
                    let path = err.path().to_string();
                    if path == "." {
                        err.inner().to_string()
                    } else {
                        format!("{} at {path}", err.inner())
                    }
                })
        };
        self.alternatives.push((values, Box::new(decode)));
        self
    }

    /// Builds the registry.
    ///
    /// # Errors
    ///
    /// [`OverlappingDiscriminator`] when a value is registered twice.
    pub fn build(self) -> Result<VariantRegistry<T>, OverlappingDiscriminator> {
        let Self {
            discriminator,
            alternatives,
        } = self;

        let mut values = Vec::new();
        let mut index = IndexMap::new();
        let mut decoders = Vec::with_capacity(alternatives.len());
        for (position, (alternative_values, decode)) in alternatives.into_iter().enumerate() {
            for &value in alternative_values {
                if index.insert(value, position).is_some() {
                    return Err(OverlappingDiscriminator {
                        discriminator,
                        value,
                    });
                }
                values.push(value);
            }
            decoders.push(decode);
        }

        Ok(VariantRegistry {
            discriminator,
            values,
            index,
            decoders,
        })
    }
}

/// A type decoded through a static [`VariantRegistry`].
pub trait VariantSet: Sized + 'static {
    /// The registry of the alternatives.
    fn registry() -> &'static VariantRegistry<Self>;
}

/// Deserializes a variant field through `registry`.
///
/// An unknown discriminator is reported with serde's `unknown variant`
/// error. The error is also remembered on the current thread so that
/// [`ResponseDecoder`](crate::ResponseDecoder) classifies it as
/// [`CallError::UnknownVariant`](crate::CallError::UnknownVariant).
///
/// # Errors
///
/// Returns the deserializer error for missing or unknown discriminators and
/// for alternatives that do not match their fields.
pub fn deserialize_variant<'de, D, T>(
    registry: &'static VariantRegistry<T>,
    deserializer: D,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    registry.decode(value).map_err(|err| match err {
        VariantError::MissingDiscriminator { discriminator } => {
            D::Error::missing_field(discriminator)
        }
        VariantError::UnknownDiscriminator { value, .. } => {
            let error = D::Error::unknown_variant(&value, &registry.values);
            DISCRIMINATOR_MISS.set(Some(error.to_string()));
            error
        }
        VariantError::InvalidAlternative { message } => D::Error::custom(message),
    })
}
