//! Pipeline driver: the fixed pass order (C3, C4, C5, C4, C6, C7, C8,
//! C4-final, then C9 & C10 via C2), wired behind a single `compile()`
//! entry point — the thing the CLI and integration tests call. Each
//! pass runs over a `Module`; the driver checks the accumulated error
//! count before invoking the next one.

use crate::models::arena::{ExprId, ItemId, TypeId};
use crate::models::ast::Ast;
use crate::models::error::{Diagnostics, DiffingoError, Result};
use crate::models::id::Id;
use crate::models::module::{DeclPayload, Module};
use crate::models::types::TypeKind;
use crate::models::unit::{FieldKind, UnitItemKind};
use crate::services::code_builder::{ClassModel, Printer};
use crate::services::{
    dependency_analyzer, id_resolver, parser_codegen, scope_builder, serializer_codegen, transform_resolver,
    type_compacter, unit_scope_builder,
};

/// Mirrors spec.md §6's CLI flags that affect code generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// `-i`/`--instantiation_only`: emit code only for the requested
    /// instantiation, not for every unit declared in the module.
    pub instantiation_only: bool,
    /// `-s`/`--store_parsing_only`: keep parsed values for fields the
    /// type compacter (C8) marked parsing-only, instead of dropping them
    /// from the generated struct.
    pub store_parsing_only: bool,
    /// `-p`/`--input_pointers`: for non-app-accessible byte fields, store
    /// stream range pointers instead of copying into the unit area.
    pub input_pointers: bool,
}

pub struct CompileOutput {
    pub header: String,
    pub implementation: String,
}

/// Runs the full pipeline for one unit instantiation and returns the
/// generated parser/serializer source pair.
///
/// `declarations` is the raw, scope-free declaration list a surface
/// loader produced: `(name, value expression, decl id)` triples, fed
/// straight to `scope_builder::build_module` to perform C3.
/// `instantiation` names the `UnitInstantiation` declaration to compile.
pub fn compile(
    ast: &mut Ast,
    module_id: Id,
    declarations: Vec<(Id, ExprId, crate::models::arena::DeclId)>,
    instantiation: &Id,
    class_name: &str,
    opts: CompileOptions,
) -> Result<CompileOutput> {
    let mut diagnostics = Diagnostics::new();

    tracing::debug!(module = %module_id, "pipeline: C3 scope builder");
    let module = scope_builder::build_module(ast, module_id, declarations);

    run_resolver(ast, &module, false, &mut diagnostics)?;

    tracing::debug!("pipeline: C5 unit scope builder");
    for unit_ty in unit_type_decls(ast, &module) {
        unit_scope_builder::build_unit_scope(ast, unit_ty);
    }

    run_resolver(ast, &module, false, &mut diagnostics)?;

    tracing::debug!("pipeline: C6 transform resolver");
    let mut all_items = Vec::new();
    for unit_ty in unit_type_decls(ast, &module) {
        collect_items(ast, unit_ty, &mut all_items);
    }
    transform_resolver::run(ast, &all_items);

    let inst_decl_id = find_instantiation(ast, &module, instantiation)?;
    let inst = match ast.decl(inst_decl_id).payload.clone() {
        DeclPayload::UnitInstantiation(inst) => inst,
        _ => {
            return Err(DiffingoError::InstantiationNotAUnit { id: instantiation.clone() });
        }
    };
    let unit_ty = inst.unit.ok_or_else(|| DiffingoError::InstantiationNotAUnit { id: instantiation.clone() })?;

    tracing::debug!(instantiation = %instantiation, "pipeline: C7 dependency analyzer");
    let deps = dependency_analyzer::analyze(ast, unit_ty, &inst);

    tracing::debug!("pipeline: C8 type compacter");
    let compacted_decl = type_compacter::compact(ast, unit_ty, &inst.id, &deps);
    let compacted_unit_ty = match ast.decl(compacted_decl).payload.clone() {
        DeclPayload::Type(t) => t,
        _ => unreachable!("type_compacter::compact always emits a Type declaration"),
    };

    run_resolver(ast, &module, true, &mut diagnostics)?;

    tracing::debug!(class_name, "pipeline: C9/C10 codegen via C2");
    let mut classes = Vec::new();
    let parser = parser_codegen::generate(ast, compacted_unit_ty, &format!("{class_name}Parser"), opts.store_parsing_only, opts.input_pointers);
    let serializer =
        serializer_codegen::generate(ast, compacted_unit_ty, &format!("{class_name}Serializer"), opts.store_parsing_only);
    classes.push(parser.class);
    classes.push(serializer.class);

    if !opts.instantiation_only {
        for other_ty in unit_type_decls(ast, &module) {
            if other_ty == unit_ty {
                continue;
            }
            let other_name = ast.ty(other_ty).id.as_ref().map(|id| id.name().to_string()).unwrap_or_default();
            if other_name.is_empty() {
                continue;
            }
            let p = parser_codegen::generate(ast, other_ty, &format!("{other_name}Parser"), opts.store_parsing_only, opts.input_pointers);
            let s = serializer_codegen::generate(ast, other_ty, &format!("{other_name}Serializer"), opts.store_parsing_only);
            classes.push(p.class);
            classes.push(s.class);
        }
    }

    let printer = Printer::new(format!("generated by diffingo for `{}`", instantiation.path_as_string()));
    let (header, implementation) = printer.print(class_name, &classes);

    Ok(CompileOutput { header, implementation })
}

fn run_resolver(ast: &mut Ast, module: &Module, report_unresolved: bool, diagnostics: &mut Diagnostics) -> Result<()> {
    id_resolver::run(ast, module, &id_resolver::ResolverOptions { report_unresolved }, diagnostics);
    if diagnostics.has_errors() {
        let errors = std::mem::take(diagnostics);
        return Err(errors.into_result().unwrap_err());
    }
    Ok(())
}

fn unit_type_decls(ast: &Ast, module: &Module) -> Vec<TypeId> {
    module
        .declarations
        .iter()
        .filter_map(|&decl_id| match &ast.decl(decl_id).payload {
            DeclPayload::Type(ty_id) if matches!(ast.ty(*ty_id).kind, TypeKind::Unit { .. }) => Some(*ty_id),
            _ => None,
        })
        .collect()
}

fn find_instantiation(ast: &Ast, module: &Module, name: &Id) -> Result<crate::models::arena::DeclId> {
    module
        .declarations
        .iter()
        .copied()
        .find(|&decl_id| ast.decl(decl_id).id.path_as_string() == name.path_as_string())
        .ok_or_else(|| DiffingoError::UnresolvedIdentifier { id: name.clone(), location: None })
}

fn collect_items(ast: &Ast, unit_ty: TypeId, out: &mut Vec<ItemId>) {
    let items = match &ast.ty(unit_ty).kind {
        TypeKind::Unit { items, .. } => items.clone(),
        _ => return,
    };
    for item_id in items {
        collect_item(ast, item_id, out);
    }
}

fn collect_item(ast: &Ast, item_id: ItemId, out: &mut Vec<ItemId>) {
    out.push(item_id);
    match &ast.item(item_id).kind {
        UnitItemKind::Field(FieldKind::Switch { cases, .. }) => {
            for case in cases {
                for &case_item in &case.items {
                    collect_item(ast, case_item, out);
                }
            }
        }
        UnitItemKind::Field(FieldKind::Vector { element }) | UnitItemKind::Field(FieldKind::List { element }) => {
            collect_item(ast, *element, out);
        }
        _ => {}
    }
}
