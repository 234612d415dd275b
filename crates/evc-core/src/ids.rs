//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  The inner integer is `pub` so
//! callers can index SoA `Vec`s directly, but `.index()` reads better.
//!
//! A physical network edge has one `EdgeId` and up to two directed
//! traversals; [`EdgeKey`] names one of them.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to `MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of a network junction.
    pub struct VertexId(u32);
}

typed_id! {
    /// Index of a physical (undirected) network edge.
    pub struct EdgeId(u32);
}

typed_id! {
    /// Index of an evacuee record in the solver's demand list.
    pub struct EvacueeId(u32);
}

// ── Direction ─────────────────────────────────────────────────────────────────

/// Traversal direction relative to the edge's digitized from → to order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Along,
    Against,
}

impl Direction {
    #[inline]
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Along   => Direction::Against,
            Direction::Against => Direction::Along,
        }
    }

    /// Bit used by direction bitmasks (`1` = along, `2` = against).
    #[inline]
    pub fn bit(self) -> u8 {
        match self {
            Direction::Along   => 1,
            Direction::Against => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Along   => "Along",
            Direction::Against => "Against",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── EdgeKey ───────────────────────────────────────────────────────────────────

/// One directed traversal of a physical edge.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeKey {
    pub id:  EdgeId,
    pub dir: Direction,
}

impl EdgeKey {
    #[inline]
    pub fn new(id: EdgeId, dir: Direction) -> Self {
        Self { id, dir }
    }

    #[inline]
    pub fn along(id: EdgeId) -> Self {
        Self { id, dir: Direction::Along }
    }

    #[inline]
    pub fn against(id: EdgeId) -> Self {
        Self { id, dir: Direction::Against }
    }

    /// The opposite traversal of the same physical edge.
    #[inline]
    pub fn reverse(self) -> Self {
        Self { id: self.id, dir: self.dir.reverse() }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.dir)
    }
}
