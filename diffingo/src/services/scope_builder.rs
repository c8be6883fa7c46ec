//! C3 — Scope Builder & Built-ins.
//!
//! Seeds a dedicated built-ins scope (the `ByteOrder` enum, the
//! `uppercase` function, and the three wire-level transforms) that every
//! module scope chains to as parent, then binds each top-level
//! declaration into its module's own scope and links child scopes for
//! enum/bitset/unit declarations.

use crate::models::arena::{ScopeId, TypeId};
use crate::models::ast::Ast;
use crate::models::expr::{ExprKind, ExprNode};
use crate::models::id::Id;
use crate::models::module::{Declaration, DeclPayload, Linkage, Module};
use crate::models::scope::Scope;
use crate::models::types::{TypeKind, TypeNode};

/// Wire type used by the three built-in transforms: an unsigned integer
/// read off the wire and converted to/from `String`.
fn uint_type(ast: &mut Ast, width: u32) -> TypeId {
    ast.push_type(TypeNode::new(TypeKind::Integer { width, signed: false }))
}

/// Builds the built-ins scope once per compilation: `ByteOrder`,
/// `uppercase`, and the three string-encoded-integer transforms.
pub fn build_builtins_scope(ast: &mut Ast) -> ScopeId {
    let scope_id = ast.push_scope(Scope::new(None));
    ast.scope_mut(scope_id).own_name = Some("builtins".to_string());

    // ByteOrder { big = 0, little = 1 }
    let byte_order_ty = ast.push_type(TypeNode::new(TypeKind::Enum {
        labels: vec![("big".to_string(), 0), ("little".to_string(), 1)],
    }));
    let byte_order_expr = ast.push_expr(ExprNode::new(ExprKind::Type(byte_order_ty)));
    ast.scope_mut(scope_id).insert("ByteOrder", byte_order_expr);

    // uppercase(string) -> string
    let string_ty = ast.push_type(TypeNode::new(TypeKind::String));
    let uppercase_ty = ast.push_type(TypeNode::new(TypeKind::Function {
        result: string_ty,
        params: vec![string_ty],
    }));
    ast.ty_mut(uppercase_ty).id = Some(Id::new("uppercase"));
    let uppercase_fn = ast.push_expr(ExprNode::new(ExprKind::Function(Id::new("uppercase"))));
    ast.scope_mut(scope_id).insert("uppercase", uppercase_fn);

    // stringEncodedUint64, hexStringEncodedUint64: String <-> uint64
    let uint64_ty = uint_type(ast, 64);
    insert_transform(ast, scope_id, "stringEncodedUint64", string_ty, uint64_ty);
    insert_transform(ast, scope_id, "hexStringEncodedUint64", string_ty, uint64_ty);

    // stringEncodedUint32: String <-> uint32
    let uint32_ty = uint_type(ast, 32);
    insert_transform(ast, scope_id, "stringEncodedUint32", string_ty, uint32_ty);

    scope_id
}

fn insert_transform(ast: &mut Ast, scope_id: ScopeId, name: &str, from: TypeId, to: TypeId) {
    let decl = ast.push_decl(Declaration {
        id: Id::new(name),
        linkage: Linkage::Exported,
        payload: DeclPayload::Transform { from, to },
    });
    let _ = decl;
    let value = ast.push_expr(ExprNode::new(ExprKind::Transform(Id::new(name))));
    ast.scope_mut(scope_id).insert(name, value);
}

/// Creates the module's own scope, chained under `builtins_scope`, and
/// binds every declaration name into it. Named enum/bitset/unit types
/// get their own child scope linked under the matching declaration name.
pub fn build_module_scope(ast: &mut Ast, module_id: Id, builtins_scope: ScopeId) -> ScopeId {
    let module_scope = ast.push_scope(Scope::new(Some(builtins_scope)));
    ast.scope_mut(module_scope).own_name = Some(module_id.name().to_string());
    module_scope
}

/// Binds one declaration's name into its owning scope, and — for
/// `Type(Unit)`/`Type(Enum)`/`Type(Bitset)` declarations — creates and
/// links the nested child scope that later passes (C4, C5) populate.
pub fn bind_declaration(ast: &mut Ast, owning_scope: ScopeId, decl_id: Id, decl_value: crate::models::arena::ExprId) {
    ast.scope_mut(owning_scope).insert(decl_id.path_as_string(), decl_value);

    if let ExprKind::Type(ty_id) = &ast.expr(decl_value).kind {
        let ty_id = *ty_id;
        let needs_child_scope = matches!(
            ast.ty(ty_id).kind,
            TypeKind::Unit { .. } | TypeKind::Enum { .. } | TypeKind::Bitset { .. }
        );
        if needs_child_scope {
            let child = ast.push_scope(Scope::new(Some(owning_scope)));
            ast.scope_mut(child).own_name = Some(decl_id.name().to_string());
            ast.ty_mut(ty_id).scope = Some(child);
            ast.scope_mut(owning_scope).add_child(decl_id.name().to_string(), child);
        }
    }
}

/// Convenience used by the pipeline driver: constructs the built-ins
/// scope plus one module scope with every top-level declaration bound,
/// returning the module.
pub fn build_module(ast: &mut Ast, module_id: Id, declarations: Vec<(Id, crate::models::arena::ExprId, crate::models::arena::DeclId)>) -> Module {
    let builtins = build_builtins_scope(ast);
    let module_scope = build_module_scope(ast, module_id.clone(), builtins);

    let mut decl_ids = Vec::with_capacity(declarations.len());
    for (id, value, decl_id) in declarations {
        bind_declaration(ast, module_scope, id, value);
        decl_ids.push(decl_id);
    }

    let mut module = Module::new(module_id, module_scope);
    module.declarations = decl_ids;
    module
}
