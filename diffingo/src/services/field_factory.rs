//! §4.5 — Field factory, shared between the ID resolver (C4) and the
//! type compacter (C8): dispatches on a resolved type to produce the
//! matching `FieldKind`.

use crate::models::ast::Ast;
use crate::models::arena::{ExprId, ItemId, TypeId};
use crate::models::types::TypeKind;
use crate::models::unit::FieldKind;

/// `Unit` type → `Unit` field; `List` type → `List` container field
/// wrapping the given element item (produced recursively by the caller
/// from the element type, per §4.5); anything else → `AtomicType`.
///
/// `element_item`, when present, is the already-constructed `ItemId` for
/// a `List`/`Vector` type's element; the surface AST (or a prior C4 run)
/// is responsible for allocating it, since the factory itself has no
/// attributes/name/location to build one from scratch.
pub fn make_field(ast: &Ast, ty: TypeId, params: Vec<ExprId>, element_item: Option<ItemId>) -> FieldKind {
    match &ast.ty(ty).kind {
        TypeKind::Unit { .. } => FieldKind::Unit { target: ty, params },
        TypeKind::List(_) => match element_item {
            Some(element) => FieldKind::List { element },
            None => FieldKind::Unknown,
        },
        _ => FieldKind::AtomicType,
    }
}
