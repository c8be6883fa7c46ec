//! C7 — Dependency Analyser.
//!
//! For each unit instantiation: walks the referenced unit recursively to
//! build a per-id neighbour map `M`, seeds a dependency list from the
//! instantiation's requested items, then closes it over `M` by fixpoint.
//! The result drives the type compacter (C8): which fields survive,
//! which collapse into opaque length-tracked ranges, and which are
//! parsing-only.

use rustc_hash::FxHashMap;

use crate::models::arena::TypeId;
use crate::models::ast::Ast;
use crate::models::attribute::keys;
use crate::models::dependency::{length_sentinel, Context, Dependency};
use crate::models::expr::{ExprKind, OperatorKind, ParserStateKind};
use crate::models::id::Id;
use crate::models::module::UnitInstantiation;
use crate::models::unit::{FieldKind, UnitItemKind};

/// `M : id -> list<Dependency>`, the neighbour map built by one walk of
/// the unit.
type DependencyMap = FxHashMap<Id, Vec<Dependency>>;

pub fn analyze(ast: &Ast, unit_ty: TypeId, inst: &UnitInstantiation) -> Vec<Dependency> {
    let mut map = DependencyMap::default();
    let unit_path = inst.id.clone();
    build_map(ast, unit_ty, &unit_path, &mut map);

    let mut deps: Vec<Dependency> = vec![Dependency::new(length_sentinel(), Context::of(Context::PARSING))];
    for item in &inst.items {
        // `item.path` is relative to the unit root; qualify it
        // the same way `build_map` qualifies field ids so the seed lands
        // on the same keys the closure walks.
        deps.push(Dependency::new(unit_path.combine(&item.path), Context::of(Context::APPLICATION)));
    }

    close_over_map(&map, deps)
        .into_iter()
        .filter(|d| d.id != length_sentinel())
        .collect()
}

fn close_over_map(map: &DependencyMap, seed: Vec<Dependency>) -> Vec<Dependency> {
    let mut current: FxHashMap<Id, Context> = FxHashMap::default();
    for dep in seed {
        let entry = current.entry(dep.id).or_insert(Context::NONE);
        *entry = entry.union(dep.context);
    }

    loop {
        let mut changed = false;
        let snapshot: Vec<(Id, Context)> = current.iter().map(|(id, ctx)| (id.clone(), *ctx)).collect();
        for (id, ctx) in snapshot {
            let Some(neighbours) = map.get(&id) else { continue };
            for neighbour in neighbours {
                let propagated = if ctx.has(Context::APPLICATION) {
                    neighbour.context
                } else {
                    neighbour.context.intersect(ctx)
                };
                let entry = current.entry(neighbour.id.clone()).or_insert(Context::NONE);
                let merged = entry.union(propagated);
                if merged != *entry {
                    *entry = merged;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    current
        .into_iter()
        .map(|(id, context)| Dependency::new(id, context))
        .collect()
}

/// Records a `from -> to` neighbour edge for every id in `from_ids`.
fn record_edges(map: &mut DependencyMap, from_ids: &[Id], to: &Id, ctx: Context) {
    for from in from_ids {
        map.entry(from.clone()).or_default().push(Dependency::new(to.clone(), ctx));
    }
}

fn attribute_context(key: &str) -> Context {
    match key {
        keys::PARSE => Context::of(Context::PARSING),
        keys::SERIALIZE => Context::of(Context::SERIALIZING),
        keys::LENGTH => Context::of(Context::PARSING | Context::SERIALIZING_UPDATE),
        keys::TRANSFORM | keys::TRANSFORM_TO => Context::NONE,
        _ => Context::of(Context::PARSING | Context::SERIALIZING),
    }
}

fn build_map(ast: &Ast, unit_ty: TypeId, unit_path: &Id, map: &mut DependencyMap) {
    let items = match &ast.ty(unit_ty).kind {
        crate::models::types::TypeKind::Unit { items, .. } => items.clone(),
        _ => return,
    };

    for item_id in items {
        let item = ast.item(item_id);
        let dollar_path = unit_path.append(item.id.name());

        for attr in item.attributes.iter() {
            if attr.key == keys::TRANSFORM || attr.key == keys::TRANSFORM_TO {
                continue;
            }
            let ctx = attribute_context(&attr.key);
            if let Some(value) = attr.value {
                let from_ids: Vec<Id> = if attr.key == keys::LENGTH {
                    vec![length_sentinel()]
                } else {
                    vec![dollar_path.clone()]
                };
                analyze_expr(ast, value, unit_path, &dollar_path, &from_ids, ctx, map);
            }
        }

        if let Some(condition) = item.condition {
            analyze_expr(ast, condition, unit_path, &dollar_path, &[dollar_path.clone()], Context::of(Context::PARSING | Context::SERIALIZING), map);
        }

        match &item.kind {
            UnitItemKind::Field(FieldKind::Unit { target, params }) => {
                for param in params {
                    analyze_expr(ast, *param, unit_path, &dollar_path, &[dollar_path.clone()], Context::of(Context::PARSING | Context::SERIALIZING), map);
                }
                build_map(ast, *target, &dollar_path, map);
            }
            UnitItemKind::Field(FieldKind::Switch { discriminant, cases }) => {
                let static_lengths: Vec<Option<u64>> = cases
                    .iter()
                    .map(|case| {
                        case.items.first().and_then(|i| {
                            let ty = ast.item(*i).serialized_type();
                            ast.type_table().static_serialized_length(ty)
                        })
                    })
                    .collect();
                let non_identical = static_lengths.windows(2).any(|w| w[0] != w[1]) || static_lengths.iter().any(Option::is_none);
                if non_identical {
                    map.entry(dollar_path.clone()).or_default().push(Dependency::new(length_sentinel(), Context::of(Context::PARSING)));
                }
                analyze_expr(ast, *discriminant, unit_path, &dollar_path, &[dollar_path.clone()], Context::of(Context::PARSING | Context::SERIALIZING), map);
                for case in cases {
                    for case_item in &case.items {
                        let case_path = unit_path.append(ast.item(*case_item).id.name());
                        record_edges(map, &[case_path.clone()], &dollar_path, Context::of(Context::PARSING | Context::SERIALIZING));
                    }
                }
                for case in cases {
                    for &case_item in &case.items {
                        analyze_field_item(ast, case_item, unit_path, map);
                    }
                }
            }
            UnitItemKind::Field(FieldKind::List { element }) => {
                let element_path = dollar_path.append("[]");
                analyze_field_item_at(ast, *element, &element_path, map);
            }
            UnitItemKind::Field(FieldKind::Vector { element }) => {
                if let Some(length_expr) = item.attributes.value_of(keys::LENGTH) {
                    analyze_expr(ast, length_expr, unit_path, &dollar_path, &[length_sentinel()], Context::of(Context::PARSING | Context::SERIALIZING_UPDATE), map);
                }
                let element_path = dollar_path.append("[]");
                analyze_field_item_at(ast, *element, &element_path, map);
            }
            _ => {}
        }
    }
}

fn analyze_field_item(ast: &Ast, item_id: crate::models::arena::ItemId, unit_path: &Id, map: &mut DependencyMap) {
    let item = ast.item(item_id);
    let dollar_path = unit_path.append(item.id.name());
    analyze_field_item_at(ast, item_id, &dollar_path, map);
}

fn analyze_field_item_at(ast: &Ast, item_id: crate::models::arena::ItemId, dollar_path: &Id, map: &mut DependencyMap) {
    let item = ast.item(item_id);
    if let UnitItemKind::Field(FieldKind::Unit { target, .. }) = &item.kind {
        build_map(ast, *target, dollar_path, map);
    }
}

/// Expression analysis: walks `expr`,
/// tracking id/member-access paths, and emits `from -> tracked` edges
/// under `ctx` whenever a non-empty tracked path completes.
fn analyze_expr(ast: &Ast, expr_id: crate::models::arena::ExprId, unit_path: &Id, dollar_path: &Id, from_ids: &[Id], ctx: Context, map: &mut DependencyMap) {
    let mut tracked = Vec::new();
    walk_expr(ast, expr_id, unit_path, dollar_path, &mut tracked);
    if let Some(id) = finalize_track(&tracked) {
        record_edges(map, from_ids, &id, ctx);
    }

    // Recurse into nested subexpressions with their own fresh tracks so
    // that e.g. Operator operands each contribute separate edges.
    walk_subexpressions(ast, expr_id, unit_path, dollar_path, from_ids, ctx, map);
}

fn finalize_track(tracked: &[String]) -> Option<Id> {
    if tracked.is_empty() {
        None
    } else {
        Some(Id::from_components(tracked.iter().cloned()))
    }
}

/// Accumulates a dotted/member-access path for one tracking slot.
fn walk_expr(ast: &Ast, expr_id: crate::models::arena::ExprId, unit_path: &Id, dollar_path: &Id, tracked: &mut Vec<String>) {
    match &ast.expr(expr_id).kind {
        ExprKind::Variable(id) | ExprKind::Id(id) => {
            tracked.extend(id.components().iter().cloned());
        }
        ExprKind::MemberAttribute { target, attribute } => {
            walk_expr(ast, *target, unit_path, dollar_path, tracked);
            tracked.extend(attribute.components().iter().cloned());
        }
        ExprKind::Operator { kind: OperatorKind::Attribute, operands } if operands.len() == 2 => {
            walk_expr(ast, operands[0], unit_path, dollar_path, tracked);
            walk_expr(ast, operands[1], unit_path, dollar_path, tracked);
        }
        ExprKind::Operator { kind: OperatorKind::Index, operands } if !operands.is_empty() => {
            walk_expr(ast, operands[0], unit_path, dollar_path, tracked);
            tracked.push("[]".to_string());
        }
        ExprKind::ParserState { kind: ParserStateKind::Self_, .. } => {
            tracked.extend(unit_path.components().iter().cloned());
        }
        ExprKind::ParserState { kind: ParserStateKind::DollarDollar, .. } => {
            tracked.extend(dollar_path.components().iter().cloned());
        }
        _ => {}
    }
}

fn walk_subexpressions(
    ast: &Ast,
    expr_id: crate::models::arena::ExprId,
    unit_path: &Id,
    dollar_path: &Id,
    from_ids: &[Id],
    ctx: Context,
    map: &mut DependencyMap,
) {
    match &ast.expr(expr_id).kind {
        ExprKind::Operator { kind, operands } => {
            if kind.is_assignment() {
                // Destination side is tracked as a write under
                // SerializingUpdate only, and only during Serializing
                // contexts.
                if ctx.has(Context::SERIALIZING) {
                    if let Some(&dest) = operands.first() {
                        let mut dest_tracked = Vec::new();
                        walk_expr(ast, dest, unit_path, dollar_path, &mut dest_tracked);
                        if let Some(id) = finalize_track(&dest_tracked) {
                            record_edges(map, from_ids, &id, Context::of(Context::SERIALIZING_UPDATE));
                        }
                    }
                }
                for operand in operands.iter().skip(1) {
                    analyze_expr(ast, *operand, unit_path, dollar_path, from_ids, ctx, map);
                }
            } else if matches!(kind, OperatorKind::MethodCall) {
                for operand in operands {
                    analyze_expr(ast, *operand, unit_path, dollar_path, from_ids, ctx, map);
                }
            } else if !matches!(kind, OperatorKind::Attribute | OperatorKind::Index) {
                for operand in operands {
                    analyze_expr(ast, *operand, unit_path, dollar_path, from_ids, ctx, map);
                }
            }
        }
        ExprKind::Find { list, cond, found, not_found } => {
            analyze_expr(ast, *list, unit_path, dollar_path, from_ids, ctx, map);
            analyze_expr(ast, *cond, unit_path, dollar_path, from_ids, ctx, map);
            analyze_expr(ast, *found, unit_path, dollar_path, from_ids, ctx, map);
            analyze_expr(ast, *not_found, unit_path, dollar_path, from_ids, ctx, map);
        }
        ExprKind::Conditional { cond, then_branch, else_branch } => {
            analyze_expr(ast, *cond, unit_path, dollar_path, from_ids, ctx, map);
            analyze_expr(ast, *then_branch, unit_path, dollar_path, from_ids, ctx, map);
            analyze_expr(ast, *else_branch, unit_path, dollar_path, from_ids, ctx, map);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attribute::Attribute;
    use crate::models::expr::ExprNode;
    use crate::models::module::InstantiationItem;
    use crate::models::types::{TypeKind, TypeNode};
    use crate::models::unit::UnitItemNode;

    fn simple_unit(ast: &mut Ast) -> TypeId {
        let u8_ty = ast.push_type(TypeNode::new(TypeKind::Integer { width: 8, signed: false }));
        let bytes_ty = ast.push_type(TypeNode::new(TypeKind::Bytes));

        let len_item = ast.push_item(UnitItemNode::new(Id::new("len"), u8_ty, UnitItemKind::Field(FieldKind::AtomicType)));

        // By the time C7 runs, C4 has already rewritten sibling-field
        // references into fully-qualified Variable ids.
        let len_ref = ast.push_expr(ExprNode::new(ExprKind::Variable(Id::parse("Msg::len"))));
        let mut payload_item = UnitItemNode::new(Id::new("payload"), bytes_ty, UnitItemKind::Field(FieldKind::AtomicType));
        payload_item.attributes.insert(Attribute::new(keys::LENGTH, Some(len_ref)));
        let payload_item_id = ast.push_item(payload_item);

        ast.push_type(TypeNode::new(TypeKind::Unit { params: vec![], items: vec![len_item, payload_item_id] }))
    }

    #[test]
    fn requested_item_pulls_in_its_length_dependency() {
        let mut ast = Ast::new();
        let unit_ty = simple_unit(&mut ast);

        let inst = UnitInstantiation {
            id: Id::new("Msg"),
            unit_ref: Id::new("Msg"),
            unit: Some(unit_ty),
            items: vec![InstantiationItem { path: Id::new("payload") }],
            dependencies: vec![],
            compacted_units: vec![],
        };

        let deps = analyze(&ast, unit_ty, &inst);
        let has_len = deps.iter().any(|d| d.id.path_as_string() == "Msg::len");
        assert!(has_len, "expected len to be pulled in via the length attribute: {deps:?}");
    }

    #[test]
    fn unreferenced_fields_are_not_in_the_dependency_list() {
        let mut ast = Ast::new();
        let unit_ty = simple_unit(&mut ast);
        let inst = UnitInstantiation {
            id: Id::new("Msg"),
            unit_ref: Id::new("Msg"),
            unit: Some(unit_ty),
            items: vec![],
            dependencies: vec![],
            compacted_units: vec![],
        };
        let deps = analyze(&ast, unit_ty, &inst);
        assert!(deps.iter().all(|d| d.id.path_as_string() != "Msg::payload"));
    }
}
