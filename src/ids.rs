use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

//////////////////////////////////////////////// IdParseError ////////////////////////////////////////////

/// Error returned when a string is not a valid identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    kind: &'static str,
    input: String,
}

impl IdParseError {
    /// The kind of identifier that failed to parse ("plant", "user", ...).
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The offending input.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl Display for IdParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "invalid {} id {:?}", self.kind, self.input)
    }
}

impl std::error::Error for IdParseError {}

////////////////////////////////////////////////// Ids ///////////////////////////////////////////////////

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps an existing UUID.
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generates a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map($name)
                    .map_err(|_| IdParseError {
                        kind: $kind,
                        input: s.to_string(),
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Identifies a registered user; every plant and activity carries one as its owner.
    UserId,
    "user"
);
define_id!(
    /// Identifies a plant.
    PlantId,
    "plant"
);
define_id!(
    /// Identifies an activity log entry.
    ActivityId,
    "activity"
);
