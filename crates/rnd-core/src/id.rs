use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Declares a string-keyed identifier. The host addresses everything by
/// name, so ids are owned strings rather than dense integers.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
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

string_id! {
    /// Identifies an experiment definition (`"crewReport"`, `"evaReport"`).
    ExperimentId
}

string_id! {
    /// Identifies a science subject: `"{experiment}@{body}{situation}{biome}"`.
    SubjectId
}

string_id! {
    /// Identifies a celestial body in the biome catalog.
    BodyId
}

string_id! {
    /// Identifies a node in the technology tree.
    TechId
}

string_id! {
    /// Identifies a part definition (`"mk1pod"`).
    PartId
}
