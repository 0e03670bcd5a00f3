use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Model identifier as understood by the vision provider.
    ModelId
);
string_id!(
    /// Client-chosen identifier of one food log entry.
    EntryId
);
string_id!(
    /// Opaque user tag. Carried through unvalidated; the identity provider's email in practice.
    UserId
);
string_id!(SessionId);
string_id!(
    /// Identifies one pipeline invocation in logs and event records.
    RunId
);

impl ModelId {
    pub fn gemini_flash() -> Self {
        Self::new("gemini-2.5-flash")
    }

    pub fn gpt_4o_mini() -> Self {
        Self::new("gpt-4o-mini")
    }
}

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl RunId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
