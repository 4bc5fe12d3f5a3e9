use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.0.to_string()[..8])
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a story document.
    StoryId
);
define_id!(
    /// Unique identifier for a segment (one chapter-sized subgraph).
    SegmentId
);
define_id!(
    /// Unique identifier for a narrative node within a segment.
    NodeId
);
define_id!(
    /// Unique identifier for an edge between two nodes.
    EdgeId
);
define_id!(
    /// Unique identifier for an attribute definition.
    AttributeId
);
define_id!(
    /// Unique identifier for an item definition.
    ItemId
);
define_id!(
    /// Unique identifier for a clue definition.
    ClueId
);
define_id!(
    /// Unique identifier for a character.
    CharacterId
);
define_id!(
    /// Unique identifier for a shop.
    ShopId
);
