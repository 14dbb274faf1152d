//! Typed identifier for a saga.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrapper. Just a string underneath — no UUID enforcement,
/// no format requirement. The protocol doesn't care what it looks like.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(SagaId, "Universally-unique opaque identifier for a saga, generated at submission and used as the primary key everywhere.");
typed_id!(UserId, "Identifier of the user who submitted a saga.");
typed_id!(AccountId, "Identifier of the account a saga is scoped to (knowledge-base filtering).");
