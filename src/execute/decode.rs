//! Response body decoders and type-erased decoded values.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

/// Decodes a response body into `T`.
pub type Decoder<T> = Arc<dyn Fn(&[u8]) -> Result<T, serde_json::Error> + Send + Sync>;

/// JSON decoder for any deserializable type.
#[must_use]
pub fn json_decoder<T: DeserializeOwned + 'static>() -> Decoder<T> {
    Arc::new(|body: &[u8]| serde_json::from_slice(body))
}

/// A decoded value whose concrete type is known only to the caller.
///
/// Produced by multi-type batches; recover the value with
/// [`ErasedValue::downcast`] using the type the item was built with.
pub struct ErasedValue {
    type_name: &'static str,
    value: Box<dyn Any + Send>,
}

impl ErasedValue {
    /// Erases `value`, remembering its type name for diagnostics.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            type_name: type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// Name of the erased type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the erased value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrows the value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Takes the value as `T`, handing `self` back on a type mismatch.
    ///
    /// # Errors
    ///
    /// Returns the unchanged value when it is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let type_name = self.type_name;
        self.value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|value| Self { type_name, value })
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Post {
        id: u32,
    }

    #[test]
    fn test_json_decoder_decodes_body() {
        let decoder = json_decoder::<Post>();
        assert_eq!(decoder(br#"{"id":1}"#).unwrap(), Post { id: 1 });
        assert!(decoder(b"oops").is_err());
    }

    #[test]
    fn test_erased_value_downcast() {
        let value = ErasedValue::new(Post { id: 7 });
        assert!(value.is::<Post>());
        assert!(!value.is::<String>());
        assert_eq!(value.downcast_ref::<Post>(), Some(&Post { id: 7 }));
        assert_eq!(value.downcast::<Post>().unwrap(), Post { id: 7 });
    }

    #[test]
    fn test_erased_value_wrong_type_returns_self() {
        let value = ErasedValue::new(42_u64);
        let value = value.downcast::<String>().unwrap_err();
        assert!(value.type_name().contains("u64"));
        assert_eq!(value.downcast::<u64>().unwrap(), 42);
    }
}
