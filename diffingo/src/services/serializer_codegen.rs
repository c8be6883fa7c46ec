//! C10 — Serializer Generator.
//!
//! Dual of the parser: walks fields in declaration order emitting each
//! field's type-specific serialize helper. One extra responsibility
//! beyond the parser's: length rewriting — before the main field pass,
//! emit code that writes each `Bytes`/`String` field's observed runtime
//! length back into the sibling field its `length` attribute points at.

use rustc_hash::FxHashSet;

use crate::models::arena::TypeId;
use crate::models::ast::Ast;
use crate::models::attribute::keys;
use crate::models::types::TypeKind;
use crate::models::unit::{FieldKind, ItemFlags, UnitItemKind};
use crate::services::code_builder::{ClassModel, Function, MemberVariable};

pub struct GeneratedSerializer {
    pub class: ClassModel,
}

/// Mirrors `parser_codegen::is_stored`: a `PARSING_ONLY` field still
/// needs a struct slot, regardless of `--store_parsing_only`, if some
/// other field's `length`/switch expression reads it back.
fn is_stored(ast: &Ast, item_id: crate::models::arena::ItemId, store_parsing_only: bool, cross_refs: &FxHashSet<String>) -> bool {
    if !ast.item(item_id).flags.has(ItemFlags::PARSING_ONLY) {
        return true;
    }
    store_parsing_only || cross_refs.contains(&sanitize_field_name(ast.item(item_id).id.name()))
}

/// Mirrors `parser_codegen::resolve_byte_order`: nearest inherited
/// `byteorder` property, `big` as the fallback.
fn resolve_byte_order(ast: &Ast, item_id: crate::models::arena::ItemId) -> bool {
    let resolved = ast
        .item(item_id)
        .attributes
        .value_of(keys::BYTEORDER)
        .and_then(|expr_id| crate::services::expr_codegen::byte_order_is_big(ast, expr_id));
    match resolved {
        Some(big) => big,
        None => {
            tracing::warn!(item = %ast.item(item_id).id, "no byteorder in scope, defaulting to big-endian");
            true
        }
    }
}

fn integer_rust_type(width: u32, signed: bool) -> &'static str {
    match (width, signed) {
        (8, false) => "u8",
        (8, true) => "i8",
        (16, false) => "u16",
        (16, true) => "i16",
        (32, false) => "u32",
        (32, true) => "i32",
        _ => {
            if signed {
                "i64"
            } else {
                "u64"
            }
        }
    }
}

pub fn generate(ast: &Ast, unit_ty: TypeId, class_name: &str, store_parsing_only: bool) -> GeneratedSerializer {
    let items = match &ast.ty(unit_ty).kind {
        TypeKind::Unit { items, .. } => items.clone(),
        _ => Vec::new(),
    };

    let cross_refs = crate::services::expr_codegen::cross_referenced_field_names(ast, &items);

    let mut class = ClassModel::new(class_name);
    class.doc = Some(format!("Serializer for `{class_name}`."));
    class.members.push(MemberVariable::new("state", "crate::runtime::ParserState"));
    let mut member_candidates = Vec::new();
    for &item_id in &items {
        flatten_switch_cases(ast, item_id, &mut member_candidates);
    }
    for item_id in member_candidates {
        if let Some(member) = atomic_member(ast, item_id, store_parsing_only, &cross_refs) {
            class.members.push(member);
        }
    }

    let mut serialize_fn = Function::new("serialize", "crate::runtime::SerializeResult")
        .with_param("out", "&mut dyn crate::runtime::OutBuf")
        .mutating();

    // Length rewrite pre-pass: for each Bytes/String field
    // whose length attribute points at a sibling, write the runtime
    // length back before the main pass runs.
    for &item_id in &items {
        if let Some(rewrite) = length_rewrite_line(ast, item_id) {
            serialize_fn = serialize_fn.with_body_line(rewrite);
        }
    }

    // `serialize`-attributed variables run first, dollar pointing at the
    // variable's own storage.
    for &item_id in &items {
        if matches!(ast.item(item_id).kind, UnitItemKind::Variable) {
            if let Some(serialize_expr) = ast.item(item_id).attributes.value_of(keys::SERIALIZE) {
                serialize_fn = serialize_fn.with_body_line(format!(
                    "// variable `{}`: run serialize expr#{:?} with $$ bound to its storage",
                    ast.item(item_id).id.name(),
                    serialize_expr
                ));
            }
        }
    }

    for &item_id in &items {
        for line in generate_field_instruction(ast, item_id, store_parsing_only, &cross_refs) {
            serialize_fn = serialize_fn.with_body_line(line);
        }
    }

    serialize_fn = serialize_fn.with_body_line("crate::runtime::SerializeResult::Done".to_string());
    class.functions.push(serialize_fn);

    GeneratedSerializer { class }
}

/// If `item`'s `length` attribute is a plain reference to a sibling
/// field (`%length = key_len`, or the `Attribute` operator form of the
/// same thing), emit the write-back line that stores the field's
/// observed runtime byte length into that sibling before the main
/// serialize pass runs — so a user who mutated the payload still ships a
/// consistent length header. Only meaningful for an owned, copied
/// field (application-accessible); a borrowed range has no runtime
/// length independent of the bytes it already points at.
fn length_rewrite_line(ast: &Ast, item_id: crate::models::arena::ItemId) -> Option<String> {
    let item = ast.item(item_id);
    if !matches!(ast.ty(item.serialized_type()).kind, TypeKind::Bytes | TypeKind::String) {
        return None;
    }
    if !item.flags.has(ItemFlags::APPLICATION_ACCESSIBLE) {
        return None;
    }
    let length_expr = item.attributes.value_of(keys::LENGTH)?;
    let target = crate::services::expr_codegen::render_field_target(ast, length_expr)?;
    let field = sanitize_field_name(item.id.name());
    Some(format!("{target} = self.{field}.len() as _;"))
}

/// Mirrors `parser_codegen::flatten_switch_cases`: a switch's case items
/// are inlined `match` arms, so their fields are plain struct members.
fn flatten_switch_cases(ast: &Ast, item_id: crate::models::arena::ItemId, out: &mut Vec<crate::models::arena::ItemId>) {
    out.push(item_id);
    if let UnitItemKind::Field(FieldKind::Switch { cases, .. }) = &ast.item(item_id).kind {
        for case in cases {
            for &case_item in &case.items {
                flatten_switch_cases(ast, case_item, out);
            }
        }
    }
}

fn atomic_member(
    ast: &Ast,
    item_id: crate::models::arena::ItemId,
    store_parsing_only: bool,
    cross_refs: &FxHashSet<String>,
) -> Option<MemberVariable> {
    let item = ast.item(item_id);
    if !matches!(item.kind, UnitItemKind::Field(FieldKind::AtomicType)) || !is_stored(ast, item_id, store_parsing_only, cross_refs) {
        return None;
    }
    match &ast.ty(item.serialized_type()).kind {
        TypeKind::Integer { width, signed } => {
            Some(MemberVariable::new(sanitize_field_name(item.id.name()), integer_rust_type(*width, *signed)))
        }
        TypeKind::Bytes | TypeKind::String if item.flags.has(ItemFlags::APPLICATION_ACCESSIBLE) => {
            Some(MemberVariable::new(sanitize_field_name(item.id.name()), "Vec<u8>"))
        }
        _ => None,
    }
}

fn generate_field_instruction(
    ast: &Ast,
    item_id: crate::models::arena::ItemId,
    store_parsing_only: bool,
    cross_refs: &FxHashSet<String>,
) -> Vec<String> {
    let item = ast.item(item_id);
    match &item.kind {
        UnitItemKind::Field(FieldKind::AtomicType) => generate_atomic(ast, item_id, store_parsing_only, cross_refs),
        UnitItemKind::Field(FieldKind::Switch { discriminant, cases }) => {
            let rendered_disc = crate::services::expr_codegen::render_int_expr(ast, *discriminant);
            let mut lines = vec![format!("match {rendered_disc} {{")];
            for case in cases {
                let labels: Vec<String> = case.labels.iter().map(|&l| crate::services::expr_codegen::render_int_expr(ast, l)).collect();
                let pattern = if labels.is_empty() { "_".to_string() } else { labels.join(" | ") };
                lines.push(format!("    {pattern} => {{"));
                for &case_item in &case.items {
                    for line in generate_field_instruction(ast, case_item, store_parsing_only, cross_refs) {
                        lines.push(format!("        {line}"));
                    }
                }
                lines.push("    }".to_string());
            }
            if !cases.iter().any(|c| c.labels.is_empty()) {
                lines.push("    _ => {}".to_string());
            }
            lines.push("}".to_string());
            lines
        }
        UnitItemKind::Field(FieldKind::Constant) => vec!["// Constant field: reserved, stub only".to_string()],
        UnitItemKind::Field(FieldKind::Ctor) => vec!["// Ctor field: reserved, stub only".to_string()],
        UnitItemKind::Field(FieldKind::Unit { .. }) => vec!["// embedded Unit field: reserved, stub only".to_string()],
        UnitItemKind::Field(FieldKind::List { .. }) => vec!["// List field: reserved, stub only".to_string()],
        UnitItemKind::Field(FieldKind::Vector { .. }) => vec!["// Vector field: reserved, stub only".to_string()],
        UnitItemKind::Field(FieldKind::Unknown) => vec!["// unresolved field placeholder survived to codegen".to_string()],
        UnitItemKind::Variable => vec![],
        UnitItemKind::Property { .. } => vec![],
    }
}

fn generate_atomic(ast: &Ast, item_id: crate::models::arena::ItemId, store_parsing_only: bool, cross_refs: &FxHashSet<String>) -> Vec<String> {
    let item = ast.item(item_id);
    match &ast.ty(item.serialized_type()).kind {
        TypeKind::Integer { width, .. } => {
            if is_stored(ast, item_id, store_parsing_only, cross_refs) {
                let big_endian = resolve_byte_order(ast, item_id);
                let to_bytes = if big_endian { "to_be_bytes" } else { "to_le_bytes" };
                vec![
                    format!("// width={width}"),
                    format!(
                        "if !out.write(&self.{}.{to_bytes}()) {{ return crate::runtime::SerializeResult::OutBufFull; }}",
                        sanitize_field_name(item.id.name()),
                    ),
                ]
            } else {
                vec!["// parsing-only field, not retained: recomputed by the length rewrite pass".to_string()]
            }
        }
        TypeKind::Bytes | TypeKind::String if item.flags.has(ItemFlags::APPLICATION_ACCESSIBLE) => {
            vec![format!(
                "if !out.write(&self.{}) {{ return crate::runtime::SerializeResult::OutBufFull; }}",
                sanitize_field_name(item.id.name()),
            )]
        }
        TypeKind::Bytes | TypeKind::String => {
            vec!["// not application-accessible: no owned payload to re-emit (only retained parsing-side)".to_string()]
        }
        _ => vec!["// atomic type without a dedicated lowering: reserved".to_string()],
    }
}

fn sanitize_field_name(name: &str) -> String {
    name.replace(['-', ' '], "_")
}
