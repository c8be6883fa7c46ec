//! `Dependency` / `Context`: the output of the dependency analyser (C7),
//! consumed by the type compacter (C8).

use crate::models::id::Id;
use serde::{Deserialize, Serialize};

/// Bitmask over `{Application, Parsing, Serializing, SerializingUpdate}`,
/// following the same bit-constant idiom as `ItemFlags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Context(u8);

impl Context {
    pub const APPLICATION: u8 = 0b0001;
    pub const PARSING: u8 = 0b0010;
    pub const SERIALIZING: u8 = 0b0100;
    pub const SERIALIZING_UPDATE: u8 = 0b1000;

    pub const NONE: Context = Context(0);

    pub fn of(bits: u8) -> Self {
        Context(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: Context) -> Context {
        Context(self.0 | other.0)
    }

    pub fn intersect(self, other: Context) -> Context {
        Context(self.0 & other.0)
    }
}

impl std::ops::BitOr for Context {
    type Output = Context;
    fn bitor(self, rhs: Context) -> Context {
        self.union(rhs)
    }
}

impl std::ops::BitAnd for Context {
    type Output = Context;
    fn bitand(self, rhs: Context) -> Context {
        self.intersect(rhs)
    }
}

/// Synthetic id used to drive "this field's length is observed
/// somewhere" propagation.
pub fn length_sentinel() -> Id {
    Id::new("__length")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: Id,
    pub context: Context,
}

impl Dependency {
    pub fn new(id: Id, context: Context) -> Self {
        Self { id, context }
    }
}
