//! C5 — Unit Scope Builder.
//!
//! For each unit `Type` declaration: binds `self` and the unit's
//! parameters into the unit's type scope, then for every flattened item
//! (including items nested inside switch cases) links the item's own
//! child scope under `__item_<name>` with `$$` bound to the item's type.

use crate::models::arena::{ItemId, ScopeId, TypeId};
use crate::models::ast::Ast;
use crate::models::expr::{ExprKind, ExprNode, ParserStateKind};
use crate::models::scope::Scope;
use crate::models::types::TypeKind;
use crate::models::unit::{FieldKind, UnitItemKind};

/// Populates the unit scope for a single `Unit`-typed declaration.
/// `unit_scope` must already exist (created by C3's `bind_declaration`).
pub fn build_unit_scope(ast: &mut Ast, unit_ty: TypeId) {
    let unit_scope = match ast.ty(unit_ty).scope {
        Some(scope) => scope,
        None => return,
    };

    let (params, items) = match &ast.ty(unit_ty).kind {
        TypeKind::Unit { params, items } => (params.clone(), items.clone()),
        _ => return,
    };

    let self_expr = ast.push_expr(ExprNode::with_type(
        ExprKind::ParserState { kind: ParserStateKind::Self_, id: None, unit: Some(unit_ty), ty: unit_ty },
        unit_ty,
    ));
    ast.scope_mut(unit_scope).insert("self", self_expr);

    for param in &params {
        let param_expr = ast.push_expr(ExprNode::with_type(
            ExprKind::ParserState { kind: ParserStateKind::Parameter, id: Some(param.id.clone()), unit: Some(unit_ty), ty: param.ty },
            param.ty,
        ));
        ast.scope_mut(unit_scope).insert(param.id.path_as_string(), param_expr);
    }

    for item_id in items {
        build_item_scope(ast, item_id, unit_scope);
    }
}

fn build_item_scope(ast: &mut Ast, item_id: ItemId, parent_scope: ScopeId) {
    let item_name = ast.item(item_id).id.name().to_string();
    let item_ty = ast.item(item_id).ty;

    // RegExp-typed items parse into Bytes for $$'s purposes.
    let dollar_ty = match &ast.ty(item_ty).kind {
        TypeKind::RegExp { .. } => ast.push_type(crate::models::types::TypeNode::new(TypeKind::Bytes)),
        _ => item_ty,
    };

    let item_scope = ast.push_scope(Scope::new(Some(parent_scope)));
    ast.scope_mut(item_scope).own_name = Some(item_name.clone());

    let dollar_expr = ast.push_expr(ExprNode::with_type(
        ExprKind::ParserState { kind: ParserStateKind::DollarDollar, id: Some(ast.item(item_id).id.clone()), unit: None, ty: dollar_ty },
        dollar_ty,
    ));
    ast.scope_mut(item_scope).insert("$$", dollar_expr);

    ast.scope_mut(parent_scope).add_child(format!("__item_{item_name}"), item_scope);

    // Recurse into switch-case items so they get their own `$$` scopes too.
    if let UnitItemKind::Field(FieldKind::Switch { cases, .. }) = &ast.item(item_id).kind {
        let case_items: Vec<ItemId> = cases.iter().flat_map(|c| c.items.clone()).collect();
        for case_item in case_items {
            build_item_scope(ast, case_item, parent_scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::id::Id;
    use crate::models::types::TypeNode;
    use crate::models::unit::UnitItemNode;
    use crate::services::scope_builder;

    #[test]
    fn self_and_parameters_are_bound() {
        let mut ast = Ast::new();
        let builtins = scope_builder::build_builtins_scope(&mut ast);
        let module_scope = scope_builder::build_module_scope(&mut ast, Id::new("Mod"), builtins);

        let field_ty = ast.push_type(TypeNode::new(TypeKind::Integer { width: 8, signed: false }));
        let field_item = ast.push_item(UnitItemNode::new(Id::new("Header::flag"), field_ty, UnitItemKind::Field(crate::models::unit::FieldKind::AtomicType)));

        let unit_ty = ast.push_type(TypeNode::new(TypeKind::Unit {
            params: vec![crate::models::types::UnitParam { id: Id::new("len"), ty: field_ty }],
            items: vec![field_item],
        }));
        let unit_value = ast.push_expr(ExprNode::new(ExprKind::Type(unit_ty)));
        scope_builder::bind_declaration(&mut ast, module_scope, Id::new("Header"), unit_value);

        build_unit_scope(&mut ast, unit_ty);

        let unit_scope = ast.ty(unit_ty).scope.unwrap();
        assert!(!ast.resolve(unit_scope, &["self".to_string()], false).is_empty());
        assert!(!ast.resolve(unit_scope, &["len".to_string()], false).is_empty());
        assert!(ast.scope(unit_scope).child("__item_flag").is_some());
    }

    #[test]
    fn item_scope_exposes_dollar_dollar() {
        let mut ast = Ast::new();
        let builtins = scope_builder::build_builtins_scope(&mut ast);
        let module_scope = scope_builder::build_module_scope(&mut ast, Id::new("Mod"), builtins);

        let field_ty = ast.push_type(TypeNode::new(TypeKind::Integer { width: 16, signed: false }));
        let field_item = ast.push_item(UnitItemNode::new(Id::new("Header::count"), field_ty, UnitItemKind::Field(crate::models::unit::FieldKind::AtomicType)));
        let unit_ty = ast.push_type(TypeNode::new(TypeKind::Unit { params: vec![], items: vec![field_item] }));
        let unit_value = ast.push_expr(ExprNode::new(ExprKind::Type(unit_ty)));
        scope_builder::bind_declaration(&mut ast, module_scope, Id::new("Header"), unit_value);

        build_unit_scope(&mut ast, unit_ty);
        let unit_scope = ast.ty(unit_ty).scope.unwrap();
        let item_scope = ast.scope(unit_scope).child("__item_count").unwrap();
        let found = ast.resolve(item_scope, &["$$".to_string()], false);
        assert_eq!(found.len(), 1);
    }
}
