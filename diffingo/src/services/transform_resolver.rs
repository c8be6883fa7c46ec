//! C6 — Transform Resolver.
//!
//! For items attributed `transform_to = T`: copies the current type into
//! `serialized_type`, then rewrites `type` to a fresh `Unknown(T)`
//! reference (or the already-resolved type expression's inner type, if
//! `T` resolved before this pass ran). `transform = f` is reserved — no
//! type rewrite yet; the next C4 run resolves the new `Unknown`.

use crate::models::arena::ItemId;
use crate::models::ast::Ast;
use crate::models::attribute::keys;
use crate::models::expr::ExprKind;
use crate::models::id::Id;
use crate::models::types::{TypeKind, TypeNode};

pub fn run(ast: &mut Ast, item_ids: &[ItemId]) {
    for &item_id in item_ids {
        resolve_item(ast, item_id);
    }
}

fn resolve_item(ast: &mut Ast, item_id: ItemId) {
    let transform_to = ast.item(item_id).attributes.value_of(keys::TRANSFORM_TO);
    let Some(transform_to_expr) = transform_to else {
        return;
    };

    let current_ty = ast.item(item_id).ty;
    ast.item_mut(item_id).serialized_type = Some(current_ty);

    let new_ty = match &ast.expr(transform_to_expr).kind {
        ExprKind::Type(resolved_ty) => {
            // Already resolved: use its inner type directly rather than
            // wrapping in another Unknown.
            *resolved_ty
        }
        ExprKind::Id(id) => ast.push_type(TypeNode::new(TypeKind::Unknown(Some(id.clone())))),
        _ => ast.push_type(TypeNode::new(TypeKind::Unknown(None))),
    };
    ast.item_mut(item_id).ty = new_ty;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::unit::{FieldKind, UnitItemKind, UnitItemNode};
    use crate::models::attribute::Attribute;

    #[test]
    fn transform_to_id_produces_unknown_placeholder() {
        let mut ast = Ast::new();
        let original_ty = ast.push_type(TypeNode::new(TypeKind::String));
        let mut item = UnitItemNode::new(Id::new("field"), original_ty, UnitItemKind::Field(FieldKind::AtomicType));
        let target_id_expr = ast.push_expr(crate::models::expr::ExprNode::new(ExprKind::Id(Id::new("Timestamp"))));
        item.attributes.insert(Attribute::new(keys::TRANSFORM_TO, Some(target_id_expr)));
        let item_id = ast.push_item(item);

        run(&mut ast, &[item_id]);

        assert_eq!(ast.item(item_id).serialized_type, Some(original_ty));
        match &ast.ty(ast.item(item_id).ty).kind {
            TypeKind::Unknown(Some(id)) => assert_eq!(id.name(), "Timestamp"),
            other => panic!("expected Unknown placeholder, got {other:?}"),
        }
    }

    #[test]
    fn items_without_transform_to_are_untouched() {
        let mut ast = Ast::new();
        let ty = ast.push_type(TypeNode::new(TypeKind::Bool));
        let item = UnitItemNode::new(Id::new("flag"), ty, UnitItemKind::Field(FieldKind::AtomicType));
        let item_id = ast.push_item(item);

        run(&mut ast, &[item_id]);
        assert!(ast.item(item_id).serialized_type.is_none());
        assert_eq!(ast.item(item_id).ty, ty);
    }
}
