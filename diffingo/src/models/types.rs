//! `Type`: the sum of every type variant the language defines.

use crate::models::arena::{ExprId, ItemId, ScopeId, TypeId};
use crate::models::attribute::AttributeMap;
use crate::models::id::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    Big,
    Little,
}

/// A unit parameter declaration (`unit Foo(len: uint16) { ... }`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitParam {
    pub id: Id,
    pub ty: TypeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeKind {
    Any,
    /// Pre-resolution placeholder; carries the referenced id, if named.
    Unknown(Option<Id>),
    /// Pre-resolution placeholder for a container element type inferred
    /// from a lambda-bound list expression.
    UnknownElementType(ExprId),
    Bool,
    Bytes,
    CAddr,
    Double,
    Sink,
    String,
    Void,
    Integer { width: u32, signed: bool },
    Tuple(Vec<TypeId>),
    Enum { labels: Vec<(String, i64)> },
    Bitset { labels: Vec<(String, u32)> },
    Bitfield { width: u32, bits: Vec<(String, (u32, u32))> },
    List(TypeId),
    Vector(TypeId),
    Set(TypeId),
    Map(TypeId, TypeId),
    RegExp { patterns: Vec<String>, attrs: AttributeMap },
    TypeType(TypeId),
    MemberAttribute(Id),
    Function { result: TypeId, params: Vec<TypeId> },
    Unit { params: Vec<UnitParam>, items: Vec<ItemId> },
}

/// Implicit label inserted into every `Enum` at construction time.
pub const ENUM_UNDEF_LABEL: &str = "UNDEF";
pub const ENUM_UNDEF_VALUE: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeNode {
    pub kind: TypeKind,
    /// Matches any concrete instance of the same variant during
    /// comparison (used by built-in transform signatures, e.g.
    /// `Integer(wildcard, wildcard)`).
    pub is_wildcard: bool,
    pub id: Option<Id>,
    pub scope: Option<ScopeId>,
}

impl TypeNode {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            is_wildcard: false,
            id: None,
            scope: None,
        }
    }

    pub fn wildcard(kind: TypeKind) -> Self {
        Self {
            kind,
            is_wildcard: true,
            id: None,
            scope: None,
        }
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    /// Make an `Enum` type, inserting the implicit `UNDEF = -1` label.
    pub fn new_enum(mut labels: Vec<(String, i64)>) -> Self {
        labels.insert(0, (ENUM_UNDEF_LABEL.to_string(), ENUM_UNDEF_VALUE));
        Self::new(TypeKind::Enum { labels })
    }
}

/// Arena of type nodes. `static_serialized_length` needs to recurse
/// through element/member types, so it is implemented against the
/// arena rather than on a standalone `TypeNode`.
pub struct TypeTable<'a> {
    pub types: &'a crate::models::arena::Arena<TypeNode>,
}

impl<'a> TypeTable<'a> {
    /// The byte width of a type if statically known, else `None`.
    pub fn static_serialized_length(&self, id: TypeId) -> Option<u64> {
        match &self.types.get(id.0).kind {
            TypeKind::Bool => Some(1),
            TypeKind::Integer { width, .. } => Some((*width as u64) / 8),
            TypeKind::Enum { .. } => Some(4),
            TypeKind::Bitset { .. } => Some(4),
            TypeKind::Bitfield { width, .. } => Some((*width as u64) / 8),
            TypeKind::Double => Some(8),
            TypeKind::CAddr => Some(8),
            TypeKind::Tuple(members) => {
                let mut total = 0u64;
                for m in members {
                    total += self.static_serialized_length(*m)?;
                }
                Some(total)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arena::Arena;

    #[test]
    fn enum_gets_implicit_undef_label() {
        let node = TypeNode::new_enum(vec![("A".to_string(), 1), ("B".to_string(), 2)]);
        match node.kind {
            TypeKind::Enum { labels } => {
                assert_eq!(labels[0], (ENUM_UNDEF_LABEL.to_string(), ENUM_UNDEF_VALUE));
                assert_eq!(labels.len(), 3);
            }
            _ => panic!("expected enum"),
        }
    }

    #[test]
    fn static_length_recurses_through_tuples() {
        let mut arena: Arena<TypeNode> = Arena::new();
        let u16_ty = arena.push(TypeNode::new(TypeKind::Integer { width: 16, signed: false }));
        let u32_ty = arena.push(TypeNode::new(TypeKind::Integer { width: 32, signed: false }));
        let tuple_ty = arena.push(TypeNode::new(TypeKind::Tuple(vec![TypeId(u16_ty), TypeId(u32_ty)])));
        let table = TypeTable { types: &arena };
        assert_eq!(table.static_serialized_length(TypeId(tuple_ty)), Some(6));
    }

    #[test]
    fn unknown_type_has_no_static_length() {
        let mut arena: Arena<TypeNode> = Arena::new();
        let bytes_ty = arena.push(TypeNode::new(TypeKind::Bytes));
        let table = TypeTable { types: &arena };
        assert_eq!(table.static_serialized_length(TypeId(bytes_ty)), None);
    }
}
