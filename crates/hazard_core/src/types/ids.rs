//! Identifier types for logic-tree and source entities.
//!
//! Strongly-typed identifiers prevent a branch id from being passed where a
//! source id or a tectonic region type is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a branch inside a logic tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use hazard_core::types::BranchId;
    ///
    /// let id = BranchId::new("b1");
    /// assert_eq!(id.as_str(), "b1");
    /// ```
    BranchId
);

string_id!(
    /// Identifier of a branch set.
    BranchSetId
);

string_id!(
    /// Identifier of a seismic source.
    ///
    /// Split sources carry the parent id followed by `:<n>`.
    SourceId
);

string_id!(
    /// Tectonic region type, e.g. `"Active Shallow Crust"`.
    TectonicRegionType
);

string_id!(
    /// Name of a ground-motion model as registered in a `GsimRegistry`.
    GsimName
);

impl SourceId {
    /// Returns the id of the `n`-th piece produced by splitting this source.
    ///
    /// ```
    /// use hazard_core::types::SourceId;
    ///
    /// assert_eq!(SourceId::new("src_1").child(3).as_str(), "src_1:3");
    /// ```
    pub fn child(&self, n: usize) -> SourceId {
        SourceId(format!("{}:{}", self.0, n))
    }

    /// Returns the id of the unsplit source this one derives from.
    ///
    /// ```
    /// use hazard_core::types::SourceId;
    ///
    /// assert_eq!(SourceId::new("src_1:3:0").base(), "src_1");
    /// assert_eq!(SourceId::new("src_1").base(), "src_1");
    /// ```
    pub fn base(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }
}

/// Identifier of a source group, assigned in first-seen order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl GroupId {
    /// Returns the id as a vector index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a site in a site collection.
pub type SiteId = u32;
