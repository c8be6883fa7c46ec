//! C8 — Type Compacter.
//!
//! Given an instantiation's dependency list, walks the referenced unit's
//! items in order and synthesizes a replacement `Unit` type that keeps
//! only needed items, marks parsing-only fields, and coalesces
//! contiguous unneeded fields into a single opaque `Bytes` range with a
//! summed `length` attribute.

use crate::models::arena::{ItemId, TypeId};
use crate::models::ast::Ast;
use crate::models::attribute::{keys, Attribute};
use crate::models::dependency::{Context, Dependency};
use crate::models::expr::{ExprKind, ExprNode, OperatorKind, ParserStateKind};
use crate::models::id::Id;
use crate::models::module::{Declaration, DeclPayload, Linkage};
use crate::models::types::{TypeKind, TypeNode};
use crate::models::unit::{FieldKind, ItemFlags, UnitItemKind, UnitItemNode};

/// Synthesizes the compacted unit and the `Type` declaration wrapping
/// it. `unit_id` is the instantiation's id, used as the new unit's name.
pub fn compact(ast: &mut Ast, unit_ty: TypeId, unit_id: &Id, deps: &[Dependency]) -> crate::models::arena::DeclId {
    let items = match &ast.ty(unit_ty).kind {
        TypeKind::Unit { items, .. } => items.clone(),
        _ => Vec::new(),
    };

    let mut new_items: Vec<ItemId> = Vec::new();
    let mut run: Vec<ItemId> = Vec::new();

    for item_id in items {
        let item_name = ast.item(item_id).id.name().to_string();
        let effective = effective_context(deps, unit_id, &item_name);

        if effective.is_empty() {
            match &ast.item(item_id).kind {
                UnitItemKind::Field(_) => run.push(item_id),
                UnitItemKind::Variable => {} // dropped silently
                UnitItemKind::Property { .. } => new_items.push(item_id),
            }
            continue;
        }

        flush_run(ast, &mut run, &mut new_items);

        if effective == Context::of(Context::PARSING) {
            ast.item_mut(item_id).flags.set(ItemFlags::PARSING_ONLY);
        }
        if effective.has(Context::APPLICATION) {
            ast.item_mut(item_id).flags.set(ItemFlags::APPLICATION_ACCESSIBLE);
        }
        new_items.push(item_id);
    }
    flush_run(ast, &mut run, &mut new_items);

    let new_unit_ty = ast.push_type(TypeNode::new(TypeKind::Unit { params: vec![], items: new_items.clone() }).with_id(unit_id.clone()));
    fixup_self_references(ast, &new_items, new_unit_ty);

    ast.push_decl(Declaration {
        id: unit_id.clone(),
        linkage: Linkage::Exported,
        payload: DeclPayload::Type(new_unit_ty),
    })
}

fn effective_context(deps: &[Dependency], unit_id: &Id, item_name: &str) -> Context {
    let item_path = unit_id.append(item_name);
    deps.iter()
        .filter(|d| d.id.is_prefix_of(&item_path) || item_path.is_prefix_of(&d.id))
        .fold(Context::NONE, |acc, d| acc.union(d.context))
}

/// Flushes a contiguous run of unneeded fields: if every field in the
/// run has a statically-computable length, fold them into one synthetic
/// opaque range; otherwise pass each through individually.
fn flush_run(ast: &mut Ast, run: &mut Vec<ItemId>, new_items: &mut Vec<ItemId>) {
    if run.is_empty() {
        return;
    }

    let lengths: Option<Vec<LengthPart>> = run
        .iter()
        .map(|&id| static_length_expr(ast, id))
        .collect();

    match lengths {
        Some(parts) if !parts.is_empty() => {
            let summed = sum_lengths(ast, &parts);
            let bytes_ty = ast.push_type(TypeNode::new(TypeKind::Bytes));
            let mut synthetic = UnitItemNode::new(Id::new("__compacted"), bytes_ty, UnitItemKind::Field(FieldKind::AtomicType));
            synthetic.attributes.insert(Attribute::new(keys::LENGTH, Some(summed)));
            synthetic.flags.set(ItemFlags::ANONYMOUS);
            // application_accessible = false: the flag is simply not set.
            let synthetic_id = ast.push_item(synthetic);
            new_items.push(synthetic_id);
        }
        _ => {
            new_items.extend(run.iter().copied());
        }
    }
    run.clear();
}

/// Either a statically known byte count or an expression computing one.
enum LengthPart {
    Static(u64),
    Expr(crate::models::arena::ExprId),
}

fn static_length_expr(ast: &Ast, item_id: ItemId) -> Option<LengthPart> {
    let item = ast.item(item_id);
    if let Some(len_expr) = item.attributes.value_of(keys::LENGTH) {
        return Some(LengthPart::Expr(len_expr));
    }
    ast.type_table().static_serialized_length(item.serialized_type()).map(LengthPart::Static)
}

fn sum_lengths(ast: &mut Ast, parts: &[LengthPart]) -> crate::models::arena::ExprId {
    let mut acc: Option<crate::models::arena::ExprId> = None;
    for part in parts {
        let expr = match part {
            LengthPart::Static(n) => ast.push_expr(ExprNode::new(ExprKind::Constant(crate::models::expr::Constant::Integer(*n as i64)))),
            LengthPart::Expr(e) => *e,
        };
        acc = Some(match acc {
            None => expr,
            Some(prev) => ast.push_expr(ExprNode::new(ExprKind::Operator { kind: OperatorKind::Plus, operands: vec![prev, expr] })),
        });
    }
    acc.unwrap_or_else(|| ast.push_expr(ExprNode::new(ExprKind::Constant(crate::models::expr::Constant::Integer(0)))))
}

/// Rewrites `ParserState(Self)` references inside the new unit's items
/// to point at the new (compacted) unit type instead of the original.
fn fixup_self_references(ast: &mut Ast, item_ids: &[ItemId], new_unit_ty: TypeId) {
    for &item_id in item_ids {
        if let Some(cond) = ast.item(item_id).condition {
            fixup_expr(ast, cond, new_unit_ty);
        }
        let attr_values: Vec<_> = ast.item(item_id).attributes.iter().filter_map(|a| a.value).collect();
        for value in attr_values {
            fixup_expr(ast, value, new_unit_ty);
        }
    }
}

fn fixup_expr(ast: &mut Ast, expr_id: crate::models::arena::ExprId, new_unit_ty: TypeId) {
    let kind = ast.expr(expr_id).kind.clone();
    match kind {
        ExprKind::ParserState { kind: ParserStateKind::Self_, id, .. } => {
            let rewritten = ExprNode::with_type(
                ExprKind::ParserState { kind: ParserStateKind::Self_, id, unit: Some(new_unit_ty), ty: new_unit_ty },
                new_unit_ty,
            );
            ast.replace_expr(expr_id, rewritten);
        }
        ExprKind::Operator { operands, .. } => {
            for operand in operands {
                fixup_expr(ast, operand, new_unit_ty);
            }
        }
        _ => {}
    }
}
