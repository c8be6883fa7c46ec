//! `Unit item`: fields, variables, and properties that make up a unit.

use crate::models::arena::{ExprId, ItemId, TypeId};
use crate::models::attribute::AttributeMap;
use crate::models::id::Id;
use crate::models::location::Location;
use serde::{Deserialize, Serialize};

/// Bit-packed flags on a unit item, mirroring the `NodeFlags` idiom used
/// elsewhere for compact per-node state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ItemFlags(u8);

impl ItemFlags {
    pub const PARSING_ONLY: u8 = 0b001;
    pub const APPLICATION_ACCESSIBLE: u8 = 0b010;
    pub const ANONYMOUS: u8 = 0b100;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn unset(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    pub fn has(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub labels: Vec<ExprId>,
    pub items: Vec<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldKind {
    AtomicType,
    Constant,
    /// Regex/bytes constructor.
    Ctor,
    /// Embedded sub-unit.
    Unit { target: TypeId, params: Vec<ExprId> },
    Switch {
        discriminant: ExprId,
        cases: Vec<SwitchCase>,
    },
    /// Sized container: `length` attribute governs the element count.
    Vector { element: ItemId },
    /// Delimited container with no static count.
    List { element: ItemId },
    /// Pre-resolution placeholder; rewritten to one of the above by the
    /// field factory once the referenced type/expression resolves.
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UnitItemKind {
    Property { key: String, value: ExprId },
    Variable,
    Field(FieldKind),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitItemNode {
    pub id: Id,
    pub ty: TypeId,
    /// Set by the transform resolver (C6) when different from `ty`.
    pub serialized_type: Option<TypeId>,
    pub attributes: AttributeMap,
    pub parent_unit: Option<TypeId>,
    pub flags: ItemFlags,
    pub kind: UnitItemKind,
    pub condition: Option<ExprId>,
    pub location: Option<Location>,
}

impl UnitItemNode {
    pub fn new(id: Id, ty: TypeId, kind: UnitItemKind) -> Self {
        Self {
            id,
            ty,
            serialized_type: None,
            attributes: AttributeMap::new(),
            parent_unit: None,
            flags: ItemFlags::new(),
            kind,
            condition: None,
            location: None,
        }
    }

    /// `serialized_type()` returns `type()` when no transform is present,
    /// else the pre-transform type.
    pub fn serialized_type(&self) -> TypeId {
        self.serialized_type.unwrap_or(self.ty)
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, UnitItemKind::Field(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, UnitItemKind::Variable)
    }

    pub fn is_property(&self) -> bool {
        matches!(self.kind, UnitItemKind::Property { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_type_falls_back_to_type() {
        let item = UnitItemNode::new(Id::new("x"), TypeId(3), UnitItemKind::Field(FieldKind::AtomicType));
        assert_eq!(item.serialized_type(), TypeId(3));
    }

    #[test]
    fn serialized_type_prefers_explicit_override() {
        let mut item = UnitItemNode::new(Id::new("x"), TypeId(3), UnitItemKind::Field(FieldKind::AtomicType));
        item.serialized_type = Some(TypeId(9));
        assert_eq!(item.serialized_type(), TypeId(9));
    }

    #[test]
    fn item_flags_roundtrip() {
        let mut flags = ItemFlags::new();
        flags.set(ItemFlags::PARSING_ONLY);
        assert!(flags.has(ItemFlags::PARSING_ONLY));
        assert!(!flags.has(ItemFlags::ANONYMOUS));
        flags.unset(ItemFlags::PARSING_ONLY);
        assert!(!flags.has(ItemFlags::PARSING_ONLY));
    }
}
