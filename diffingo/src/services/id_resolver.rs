//! C4 — ID Resolver.
//!
//! Single-pass pre-order visitor with four responsibilities: resolving
//! `ID` expressions, rewriting lambda-bound variable references,
//! resolving unit-instantiation targets, and replacing `Unknown`
//! placeholders (types and unit-field placeholders) with their resolved
//! counterparts. Run three times by the pipeline driver: after C3, after
//! C5, and finally after C8 with `report_unresolved` on.

use crate::models::arena::{ExprId, ItemId, ScopeId};
use crate::models::ast::Ast;
use crate::models::error::{DiffingoError, Diagnostics};
use crate::models::expr::{ExprKind, ExprNode, ParserStateKind};
use crate::models::id::Id;
use crate::models::module::{DeclPayload, Module};
use crate::models::types::{TypeKind, TypeNode};
use crate::models::unit::{FieldKind, UnitItemKind};
use crate::services::field_factory;

pub struct ResolverOptions {
    /// When set, an unresolved ID or multiply-defined identifier is a
    /// hard error; otherwise resolution failures are left for a later
    /// run to retry.
    pub report_unresolved: bool,
}

/// Resolves every `ID` expression, `Unknown` type, and `Unknown` field
/// placeholder reachable from `module`'s declarations.
pub fn run(ast: &mut Ast, module: &Module, opts: &ResolverOptions, diagnostics: &mut Diagnostics) {
    let decl_ids: Vec<_> = module.declarations.clone();
    for decl_id in decl_ids {
        resolve_declaration(ast, decl_id, module.scope, opts, diagnostics);
    }
}

fn resolve_declaration(
    ast: &mut Ast,
    decl_id: crate::models::arena::DeclId,
    module_scope: ScopeId,
    opts: &ResolverOptions,
    diagnostics: &mut Diagnostics,
) {
    let payload = ast.decl(decl_id).payload.clone();
    match payload {
        DeclPayload::Type(ty_id) => resolve_type(ast, ty_id, module_scope, opts, diagnostics),
        DeclPayload::UnitInstantiation(mut inst) => {
            resolve_instantiation(ast, &mut inst, module_scope, opts, diagnostics);
            ast.decl_mut(decl_id).payload = DeclPayload::UnitInstantiation(inst);
        }
        DeclPayload::Constant(expr_id) => {
            resolve_expr(ast, expr_id, module_scope, module_scope, opts, diagnostics);
        }
        DeclPayload::Function { body: Some(body), .. } => {
            resolve_expr(ast, body, module_scope, module_scope, opts, diagnostics);
        }
        DeclPayload::Function { .. } | DeclPayload::Transform { .. } => {}
    }
}

/// (c) Unit instantiations: resolve the referenced unit id; it must
/// resolve to a `Type` expression whose inner type is a `Unit`.
fn resolve_instantiation(
    ast: &mut Ast,
    inst: &mut crate::models::module::UnitInstantiation,
    module_scope: ScopeId,
    opts: &ResolverOptions,
    diagnostics: &mut Diagnostics,
) {
    if inst.unit.is_some() {
        return;
    }
    let path = inst.unit_ref.components().to_vec();
    let found = ast.resolve(module_scope, &path, true);
    match found.as_slice() {
        [] => {
            if opts.report_unresolved {
                diagnostics.report(DiffingoError::UnresolvedIdentifier {
                    id: inst.unit_ref.clone(),
                    location: None,
                });
            }
        }
        [single] => match &ast.expr(*single).kind {
            ExprKind::Type(ty_id) => {
                let ty_id = *ty_id;
                if matches!(ast.ty(ty_id).kind, TypeKind::Unit { .. }) {
                    inst.unit = Some(ty_id);
                } else {
                    diagnostics.report(DiffingoError::InstantiationNotAUnit {
                        id: inst.unit_ref.clone(),
                    });
                }
            }
            _ => diagnostics.report(DiffingoError::InstantiationNotAUnit {
                id: inst.unit_ref.clone(),
            }),
        },
        _ => diagnostics.report(DiffingoError::MultiplyDefinedIdentifier {
            id: inst.unit_ref.clone(),
            location: None,
        }),
    }
}

/// (d) `Unknown` type references: resolved the same way as ID
/// expressions, then the referenced unit's items are visited too.
fn resolve_type(ast: &mut Ast, ty_id: crate::models::arena::TypeId, scope: ScopeId, opts: &ResolverOptions, diagnostics: &mut Diagnostics) {
    let kind = ast.ty(ty_id).kind.clone();
    match kind {
        TypeKind::Unknown(Some(id)) => {
            if let Some(resolved) = resolve_id_to_type(ast, &id, scope, opts, diagnostics) {
                // Mirrors the ground truth's `node.replace(tv)`: the
                // `Unknown` slot becomes the resolved type itself, not a
                // wrapper around it. Only stamp the referenced id onto it
                // when it doesn't already carry one of its own.
                let mut replacement = ast.ty(resolved).clone();
                if replacement.id.is_none() {
                    replacement.id = Some(id);
                }
                ast.replace_type(ty_id, replacement);
            }
        }
        TypeKind::Unit { items, .. } => {
            let unit_scope = ast.ty(ty_id).scope.unwrap_or(scope);
            for item_id in items {
                resolve_item(ast, item_id, unit_scope, opts, diagnostics);
            }
        }
        _ => {}
    }
}

fn resolve_id_to_type(
    ast: &mut Ast,
    id: &Id,
    scope: ScopeId,
    opts: &ResolverOptions,
    diagnostics: &mut Diagnostics,
) -> Option<crate::models::arena::TypeId> {
    let found = lookup_with_module_fallback(ast, scope, id, opts, diagnostics)?;
    match &ast.expr(found).kind {
        ExprKind::Type(ty_id) => Some(*ty_id),
        _ => None,
    }
}

/// Direct lookup, falling back to stripping a leading module-name
/// component when the path is scoped with it.
fn lookup_with_module_fallback(
    ast: &Ast,
    scope: ScopeId,
    id: &Id,
    opts: &ResolverOptions,
    diagnostics: &mut Diagnostics,
) -> Option<ExprId> {
    let path = id.components().to_vec();
    let found = ast.resolve(scope, &path, true);
    let found = if found.is_empty() && path.len() > 1 {
        ast.resolve(scope, &path[1..], true)
    } else {
        found
    };

    match found.as_slice() {
        [] => {
            if opts.report_unresolved {
                diagnostics.report(DiffingoError::UnresolvedIdentifier {
                    id: id.clone(),
                    location: None,
                });
            }
            None
        }
        [single] => Some(*single),
        _ => {
            diagnostics.report(DiffingoError::MultiplyDefinedIdentifier {
                id: id.clone(),
                location: None,
            });
            None
        }
    }
}

fn resolve_item(ast: &mut Ast, item_id: ItemId, unit_scope: ScopeId, opts: &ResolverOptions, diagnostics: &mut Diagnostics) {
    // C5 links each item's `$$`-bearing scope as a `__item_<name>` child
    // of the unit scope (switch-case items flattened in alongside their
    // siblings, per `unit_scope_builder::build_item_scope`). Before C5
    // has run, or for items C5 doesn't give their own scope (vector/list
    // elements), there is no such child yet — fall back to the unit
    // scope itself so plain identifier lookups still work.
    let item_name = ast.item(item_id).id.name().to_string();
    let item_scope = ast.scope(unit_scope).child(&format!("__item_{item_name}")).unwrap_or(unit_scope);
    let kind = ast.item(item_id).kind.clone();

    match kind {
        UnitItemKind::Field(FieldKind::Unknown) => {
            resolve_unknown_field(ast, item_id, item_scope, opts, diagnostics);
        }
        UnitItemKind::Field(FieldKind::Switch { discriminant, cases }) => {
            resolve_expr(ast, discriminant, item_scope, item_scope, opts, diagnostics);
            for case in &cases {
                for label in &case.labels {
                    resolve_expr(ast, *label, item_scope, item_scope, opts, diagnostics);
                }
                for case_item in &case.items {
                    // Case items are flattened as children of `unit_scope`,
                    // not nested under the switch field's own scope.
                    resolve_item(ast, *case_item, unit_scope, opts, diagnostics);
                }
            }
        }
        UnitItemKind::Field(FieldKind::Vector { element }) | UnitItemKind::Field(FieldKind::List { element }) => {
            resolve_item(ast, element, unit_scope, opts, diagnostics);
        }
        UnitItemKind::Property { value, .. } => {
            resolve_expr(ast, value, item_scope, item_scope, opts, diagnostics);
        }
        _ => {}
    }

    if let Some(condition) = ast.item(item_id).condition {
        resolve_expr(ast, condition, item_scope, item_scope, opts, diagnostics);
    }
}

/// `Unknown` field placeholders are rewritten based on what their id
/// resolves to: a `Ctor` expression yields a `Ctor` field, a `Constant`
/// expression a `Constant` field, a `Type` expression a field produced
/// via the field factory (§4.5). All of the item's other state
/// (attributes, condition, name, location, flags) is preserved.
fn resolve_unknown_field(ast: &mut Ast, item_id: ItemId, scope: ScopeId, opts: &ResolverOptions, diagnostics: &mut Diagnostics) {
    let item_id_path = ast.item(item_id).id.clone();
    let Some(found) = lookup_with_module_fallback(ast, scope, &item_id_path, opts, diagnostics) else {
        return;
    };

    let new_kind = match &ast.expr(found).kind {
        ExprKind::Ctor { .. } => FieldKind::Ctor,
        ExprKind::Constant(_) => FieldKind::Constant,
        ExprKind::Type(ty_id) => field_factory::make_field(ast, *ty_id, vec![], None),
        _ => {
            diagnostics.report(DiffingoError::UnexpectedPlaceholderType {
                kind: "Unknown field placeholder resolved to a non type/ctor/constant expression".to_string(),
                item: item_id_path.clone(),
            });
            return;
        }
    };

    ast.item_mut(item_id).kind = UnitItemKind::Field(new_kind);
}

/// (a)+(b) Resolve `ID` expressions and lambda variables within `expr_id`.
/// `from_scope` is the most specific enclosing scope to search from;
/// `lambda_ctx`, when set inside a `Find` body, names the bound
/// parameter and the list whose element type it stands for.
fn resolve_expr(
    ast: &mut Ast,
    expr_id: ExprId,
    scope: ScopeId,
    module_scope: ScopeId,
    opts: &ResolverOptions,
    diagnostics: &mut Diagnostics,
) {
    resolve_expr_inner(ast, expr_id, scope, module_scope, None, opts, diagnostics);
}

fn resolve_expr_inner(
    ast: &mut Ast,
    expr_id: ExprId,
    scope: ScopeId,
    module_scope: ScopeId,
    lambda_param: Option<&Id>,
    opts: &ResolverOptions,
    diagnostics: &mut Diagnostics,
) {
    let kind = ast.expr(expr_id).kind.clone();
    match kind {
        ExprKind::Id(id) => {
            if Some(&id) == lambda_param {
                ast.replace_expr(expr_id, ExprNode::new(ExprKind::Variable(id)));
                return;
            }
            if let Some(found) = lookup_with_module_fallback(ast, scope, &id, opts, diagnostics) {
                let resolved = ast.expr(found).clone_inner();
                ast.replace_expr(expr_id, resolved);
            }
        }
        ExprKind::Find { list, cond, found, not_found } => {
            resolve_expr_inner(ast, list, scope, module_scope, lambda_param, opts, diagnostics);
            resolve_expr_inner(ast, cond, scope, module_scope, lambda_param, opts, diagnostics);
            resolve_expr_inner(ast, found, scope, module_scope, lambda_param, opts, diagnostics);
            resolve_expr_inner(ast, not_found, scope, module_scope, lambda_param, opts, diagnostics);
        }
        ExprKind::Lambda { param, body } => {
            resolve_expr_inner(ast, body, scope, module_scope, Some(&param), opts, diagnostics);
        }
        ExprKind::Assign { target, value } => {
            resolve_expr_inner(ast, target, scope, module_scope, lambda_param, opts, diagnostics);
            resolve_expr_inner(ast, value, scope, module_scope, lambda_param, opts, diagnostics);
        }
        ExprKind::Conditional { cond, then_branch, else_branch } => {
            resolve_expr_inner(ast, cond, scope, module_scope, lambda_param, opts, diagnostics);
            resolve_expr_inner(ast, then_branch, scope, module_scope, lambda_param, opts, diagnostics);
            resolve_expr_inner(ast, else_branch, scope, module_scope, lambda_param, opts, diagnostics);
        }
        ExprKind::ListComprehension { element, list, cond } => {
            resolve_expr_inner(ast, element, scope, module_scope, lambda_param, opts, diagnostics);
            resolve_expr_inner(ast, list, scope, module_scope, lambda_param, opts, diagnostics);
            if let Some(cond) = cond {
                resolve_expr_inner(ast, cond, scope, module_scope, lambda_param, opts, diagnostics);
            }
        }
        ExprKind::MemberAttribute { target, .. } => {
            resolve_expr_inner(ast, target, scope, module_scope, lambda_param, opts, diagnostics);
        }
        ExprKind::Operator { operands, .. } => {
            for operand in operands {
                resolve_expr_inner(ast, operand, scope, module_scope, lambda_param, opts, diagnostics);
            }
        }
        ExprKind::ParserState { kind: ParserStateKind::Parameter, .. }
        | ExprKind::ParserState { kind: ParserStateKind::Self_, .. }
        | ExprKind::ParserState { kind: ParserStateKind::DollarDollar, .. } => {}
        ExprKind::Variable(id) => {
            if lambda_param.is_none() {
                // A lambda variable encountered outside a Find body is an error.
                diagnostics.report(DiffingoError::LambdaOutsideFind { id });
            }
        }
        ExprKind::Constant(_)
        | ExprKind::Ctor { .. }
        | ExprKind::Function(_)
        | ExprKind::Type(_)
        | ExprKind::Transform(_)
        | ExprKind::Unresolved(_) => {}
    }
}

impl ExprNode {
    /// Cheap clone used when splicing a resolved scope value into a
    /// placeholder's slot; scope values are small reference expressions
    /// (`Type`/`Transform`/`Function`/`ParserState`), never deep trees.
    fn clone_inner(&self) -> ExprNode {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::module::{Declaration, DeclPayload, Linkage};
    use crate::services::scope_builder;

    fn opts(report: bool) -> ResolverOptions {
        ResolverOptions { report_unresolved: report }
    }

    #[test]
    fn id_expression_resolves_to_builtin_type() {
        let mut ast = Ast::new();
        let builtins = scope_builder::build_builtins_scope(&mut ast);
        let module_scope = scope_builder::build_module_scope(&mut ast, Id::new("Mod"), builtins);

        let id_expr = ast.push_expr(ExprNode::new(ExprKind::Id(Id::new("ByteOrder"))));
        let mut diag = Diagnostics::new();
        resolve_expr(&mut ast, id_expr, module_scope, module_scope, &opts(true), &mut diag);

        assert!(!diag.has_errors());
        assert!(matches!(ast.expr(id_expr).kind, ExprKind::Type(_)));
    }

    #[test]
    fn unresolved_id_reports_error_only_when_asked() {
        let mut ast = Ast::new();
        let builtins = scope_builder::build_builtins_scope(&mut ast);
        let module_scope = scope_builder::build_module_scope(&mut ast, Id::new("Mod"), builtins);

        let id_expr = ast.push_expr(ExprNode::new(ExprKind::Id(Id::new("Nope"))));
        let mut diag = Diagnostics::new();
        resolve_expr(&mut ast, id_expr, module_scope, module_scope, &opts(false), &mut diag);
        assert!(!diag.has_errors());

        let id_expr2 = ast.push_expr(ExprNode::new(ExprKind::Id(Id::new("Nope"))));
        let mut diag2 = Diagnostics::new();
        resolve_expr(&mut ast, id_expr2, module_scope, module_scope, &opts(true), &mut diag2);
        assert!(diag2.has_errors());
    }

    #[test]
    fn lambda_variable_inside_find_is_rewritten() {
        let mut ast = Ast::new();
        let param = Id::new("x");
        let id_ref = ast.push_expr(ExprNode::new(ExprKind::Id(param.clone())));
        let lambda = ast.push_expr(ExprNode::new(ExprKind::Lambda { param: param.clone(), body: id_ref }));

        let builtins = scope_builder::build_builtins_scope(&mut ast);
        let module_scope = scope_builder::build_module_scope(&mut ast, Id::new("Mod"), builtins);
        let mut diag = Diagnostics::new();
        resolve_expr(&mut ast, lambda, module_scope, module_scope, &opts(true), &mut diag);

        assert!(!diag.has_errors());
        assert!(matches!(ast.expr(id_ref).kind, ExprKind::Variable(_)));
    }

    #[test]
    fn instantiation_requires_unit_type_target() {
        let mut ast = Ast::new();
        let builtins = scope_builder::build_builtins_scope(&mut ast);
        let module_scope = scope_builder::build_module_scope(&mut ast, Id::new("Mod"), builtins);

        // ByteOrder resolves to a Type, but not a Unit.
        let mut inst = crate::models::module::UnitInstantiation {
            id: Id::new("inst"),
            unit_ref: Id::new("ByteOrder"),
            unit: None,
            items: vec![],
            dependencies: vec![],
            compacted_units: vec![],
        };
        let mut diag = Diagnostics::new();
        resolve_instantiation(&mut ast, &mut inst, module_scope, &opts(true), &mut diag);
        assert!(diag.has_errors());
        assert!(inst.unit.is_none());
    }

    #[test]
    fn module_scope_decl_dispatch_resolves_constants() {
        let mut ast = Ast::new();
        let builtins = scope_builder::build_builtins_scope(&mut ast);
        let module_scope = scope_builder::build_module_scope(&mut ast, Id::new("Mod"), builtins);

        let id_expr = ast.push_expr(ExprNode::new(ExprKind::Id(Id::new("ByteOrder"))));
        let decl_id = ast.push_decl(Declaration {
            id: Id::new("const_ref"),
            linkage: Linkage::Private,
            payload: DeclPayload::Constant(id_expr),
        });
        let module = Module {
            id: Id::new("Mod"),
            properties: Default::default(),
            declarations: vec![decl_id],
            scope: module_scope,
        };
        let mut diag = Diagnostics::new();
        run(&mut ast, &module, &opts(true), &mut diag);
        assert!(!diag.has_errors());
        assert!(matches!(ast.expr(id_expr).kind, ExprKind::Type(_)));
    }

    /// A named-type reference (`Unknown(Some(id))`) must resolve to the
    /// referenced type itself, not a `TypeType` wrapper around it — a
    /// wrapped type has no `static_serialized_length` and no C8/C9/C10
    /// handling, so it would silently fall through to a stub.
    #[test]
    fn unknown_named_type_reference_resolves_to_the_referenced_type_itself() {
        let mut ast = Ast::new();
        let builtins = scope_builder::build_builtins_scope(&mut ast);
        let module_scope = scope_builder::build_module_scope(&mut ast, Id::new("Mod"), builtins);

        // `type Foo = uint32;` bound into the module scope.
        let foo_ty = ast.push_type(TypeNode::new(TypeKind::Integer { width: 32, signed: false }));
        let foo_expr = ast.push_expr(ExprNode::new(ExprKind::Type(foo_ty)));
        scope_builder::bind_declaration(&mut ast, module_scope, Id::new("Foo"), foo_expr);

        // A field declared with type `Foo`, still pending resolution.
        let unknown_ty = ast.push_type(TypeNode::new(TypeKind::Unknown(Some(Id::new("Foo")))));
        let mut diag = Diagnostics::new();
        resolve_type(&mut ast, unknown_ty, module_scope, &opts(true), &mut diag);

        assert!(!diag.has_errors());
        assert!(matches!(ast.ty(unknown_ty).kind, TypeKind::Integer { width: 32, signed: false }));
        assert_eq!(ast.type_table().static_serialized_length(unknown_ty), Some(4));
    }

    /// An item's own `$$` reference (e.g. a condition or length keyed off
    /// the item's own parsed value) must resolve against the `__item_<name>`
    /// scope C5 links under the unit scope, not the bare unit scope, which
    /// has no `$$` binding at all.
    #[test]
    fn item_dollar_dollar_reference_resolves_after_c5_builds_its_scope() {
        use crate::models::unit::UnitItemNode;

        let mut ast = Ast::new();
        let builtins = scope_builder::build_builtins_scope(&mut ast);
        let module_scope = scope_builder::build_module_scope(&mut ast, Id::new("Mod"), builtins);

        let field_ty = ast.push_type(TypeNode::new(TypeKind::Integer { width: 8, signed: false }));
        let dollar_ref = ast.push_expr(ExprNode::new(ExprKind::Id(Id::new("$$"))));
        let mut item = UnitItemNode::new(Id::new("flag"), field_ty, UnitItemKind::Field(FieldKind::AtomicType));
        item.condition = Some(dollar_ref);
        let item_id = ast.push_item(item);

        let unit_ty = ast.push_type(TypeNode::new(TypeKind::Unit { params: vec![], items: vec![item_id] }));
        let unit_expr = ast.push_expr(ExprNode::new(ExprKind::Type(unit_ty)));
        scope_builder::bind_declaration(&mut ast, module_scope, Id::new("Header"), unit_expr);

        crate::services::unit_scope_builder::build_unit_scope(&mut ast, unit_ty);

        let mut diag = Diagnostics::new();
        resolve_type(&mut ast, unit_ty, module_scope, &opts(true), &mut diag);

        assert!(!diag.has_errors());
        assert!(matches!(ast.expr(dollar_ref).kind, ExprKind::ParserState { kind: ParserStateKind::DollarDollar, .. }));
    }
}
