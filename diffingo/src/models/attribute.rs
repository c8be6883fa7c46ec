//! Attribute keys and the last-write-wins `AttributeMap`.

use crate::models::arena::ExprId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A single `%key = value` (or bare `%key`) annotation on a unit item.
/// Leading sigils (`%`) are stripped by the surface parser before this
/// type is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: Option<ExprId>,
    pub internal: bool,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: Option<ExprId>) -> Self {
        Self {
            key: key.into(),
            value,
            internal: false,
        }
    }
}

/// Recognized attribute keys. Anything else is
/// accepted and treated conservatively by the dependency analyser (C7)
/// as both parse- and serialize-relevant.
pub mod keys {
    pub const LENGTH: &str = "length";
    pub const TRANSFORM: &str = "transform";
    pub const TRANSFORM_TO: &str = "transform_to";
    pub const PARSE: &str = "parse";
    pub const SERIALIZE: &str = "serialize";
    pub const BYTEORDER: &str = "byteorder";
    pub const CHUNKED: &str = "chunked";
}

/// Keyed dictionary of attributes. Last write wins; iteration order is
/// irrelevant to semantics, so a hash map (rather than an insertion-order
/// map) is the right fit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeMap {
    entries: FxHashMap<String, Attribute>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attr: Attribute) {
        self.entries.insert(attr.key.clone(), attr);
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.entries.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn value_of(&self, key: &str) -> Option<ExprId> {
        self.entries.get(key).and_then(|a| a.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
