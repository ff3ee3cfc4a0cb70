//! Identifier types shared by key stores and their consumers.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype wrapper around `i64` for database row ids.
///
/// Each generated type:
/// - Is a transparent wrapper around `i64`
/// - Derives `Copy`, `Clone`, `Debug`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Derives `Serialize` and `Deserialize` (transparent)
/// - Implements `From<i64>` and `Into<i64>`
/// - Implements `Display` that outputs the inner value
macro_rules! define_row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_row_id!(
    /// Persisted identifier of a signing algorithm name.
    ///
    /// Keys reference their algorithm through this id rather than repeating
    /// the name on every row. Ids are assigned by the store the first time an
    /// algorithm name is inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokensmith_storage::AlgorithmId;
    ///
    /// let id = AlgorithmId::from(1);
    /// assert_eq!(i64::from(id), 1);
    /// assert_eq!(id.to_string(), "1");
    /// ```
    AlgorithmId
);

/// Globally unique signing key identifier (random 128-bit UUID).
///
/// This is the value carried in the `kid` header of every token.
///
/// # Examples
///
/// ```
/// use tokensmith_storage::KeyId;
///
/// let id = KeyId::new_random();
/// let parsed: KeyId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(Uuid);

impl KeyId {
    /// Generates a fresh random (v4) key id.
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for KeyId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<KeyId> for Uuid {
    fn from(id: KeyId) -> Self {
        id.0
    }
}

impl FromStr for KeyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_random_key_ids_differ() {
        assert_ne!(KeyId::new_random(), KeyId::new_random());
    }

    #[test]
    fn test_key_id_display_is_hyphenated() {
        let id: KeyId = "6f1c0f0e-3d7e-4d2f-9a57-2f2a1cbbd6a1".parse().unwrap();
        assert_eq!(id.to_string(), "6f1c0f0e-3d7e-4d2f-9a57-2f2a1cbbd6a1");
    }

    #[test]
    fn test_key_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<KeyId>().is_err());
        assert!("".parse::<KeyId>().is_err());
    }

    #[test]
    fn test_key_id_serializes_as_string() {
        let id = KeyId::new_random();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
