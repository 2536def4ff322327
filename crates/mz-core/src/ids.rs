use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Compact, stable identifier used across the engine's data model.
///
/// Stored as `NonZeroU32` so `Option<Id>` costs nothing extra. Model inputs
/// may number their objects sparsely; the network keeps id→index maps, and
/// solver code works in dense indices only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::new(index + 1).expect("index+1 is nonzero"))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Domain-specific aliases (no runtime cost).
pub type NodeId = Id;
pub type LinkId = Id;
pub type SpeciesId = Id;
pub type ScheduleId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_index() {
        for i in [0_u32, 1, 7, 1000] {
            assert_eq!(Id::from_index(i).index(), i);
        }
    }

    #[test]
    fn option_id_is_free() {
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }

    #[test]
    fn display_uses_index() {
        assert_eq!(Id::from_index(3).to_string(), "3");
    }
}
