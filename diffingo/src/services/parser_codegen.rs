//! C9 — Parser Generator.
//!
//! Lowers a compacted unit into a resumable parser: a labeled
//! instruction sequence, addressed by the `ParserState`'s instruction
//! pointer so that an `OUT_OF_DATA` return can be resumed without
//! re-running already-completed fields. Goto-threading has no direct
//! Rust equivalent, so each label becomes an `if resume_at <= label`
//! guard in sequence, dispatched from a single `parse` method.

use rustc_hash::FxHashSet;

use crate::models::arena::TypeId;
use crate::models::ast::Ast;
use crate::models::attribute::keys;
use crate::models::id::Id;
use crate::models::types::TypeKind;
use crate::models::unit::{FieldKind, ItemFlags, UnitItemKind};
use crate::services::code_builder::{ClassModel, Function, MemberVariable};

/// Whether a field's parsed value is kept as struct storage. Fields
/// flagged `PARSING_ONLY` by the type compacter (C8) are dropped unless
/// `--store_parsing_only` asked to keep them, UNLESS some other field's
/// `length`/switch expression references it — each field lowers to its
/// own `if`/`match` block with its own locals, so a cross-referenced
/// field needs a real struct slot to survive into a later block
/// regardless of whether the application itself wants to see it.
fn is_stored(ast: &Ast, item_id: crate::models::arena::ItemId, store_parsing_only: bool, cross_refs: &FxHashSet<String>) -> bool {
    if !ast.item(item_id).flags.has(ItemFlags::PARSING_ONLY) {
        return true;
    }
    store_parsing_only || cross_refs.contains(&sanitize_field_name(ast.item(item_id).id.name()))
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

/// One labeled step of the resumable parser.
pub struct Instruction {
    pub label: u32,
    pub field_name: String,
    pub code: Vec<String>,
}

pub struct GeneratedParser {
    pub class: ClassModel,
    pub instructions: Vec<Instruction>,
}

/// Nearest inherited `byteorder` property; `big` is the fallback,
/// with a warning, when none is in scope or its value isn't one of the
/// recognized `ByteOrder` shapes (spec §4.8 item 5 / §7 item 5).
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

pub fn generate(ast: &Ast, unit_ty: TypeId, class_name: &str, store_parsing_only: bool, input_pointers: bool) -> GeneratedParser {
    let items = match &ast.ty(unit_ty).kind {
        TypeKind::Unit { items, .. } => items.clone(),
        _ => Vec::new(),
    };

    let cross_refs = crate::services::expr_codegen::cross_referenced_field_names(ast, &items);

    let mut instructions = Vec::new();
    let mut label = 0u32;
    for item_id in &items {
        let code = generate_field_instruction(ast, *item_id, label, store_parsing_only, input_pointers, &cross_refs);
        instructions.push(Instruction {
            label,
            field_name: ast.item(*item_id).id.name().to_string(),
            code,
        });
        label += 1;
    }

    let mut class = ClassModel::new(class_name);
    class.doc = Some(format!("Resumable parser for `{class_name}`."));
    class.members.push(MemberVariable::new("state", "crate::runtime::ParserState"));
    let mut member_candidates = Vec::new();
    for &item_id in &items {
        flatten_switch_cases(ast, item_id, &mut member_candidates);
    }
    for item_id in member_candidates {
        if let Some(member) = atomic_member(ast, item_id, store_parsing_only, input_pointers, &cross_refs) {
            class.members.push(member);
        }
    }

    // Resumable control flow: instead of a computed goto, an
    // `if resume_at <= label { ... }` per field. A field whose code
    // returns `OutOfData` first saves its own label as the resume point;
    // fields already completed in a prior call are skipped entirely
    // because `resume_at` is now past their label, and storage for them
    // was already written on that prior call.
    let mut parse_fn = Function::new("parse", "crate::runtime::ParseResult")
        .with_param("cursor", "&mut crate::runtime::Cursor<'_>")
        .with_param("area", "&mut crate::runtime::UnitArea")
        .mutating();
    parse_fn = parse_fn.with_body_line("let resume_at = self.state.instruction_pointer.unwrap_or(0);".to_string());
    for instr in &instructions {
        parse_fn = parse_fn.with_body_line(format!("if resume_at <= {} {{ // {}", instr.label, instr.field_name));
        for line in &instr.code {
            parse_fn = parse_fn.with_body_line(format!("    {line}"));
        }
        parse_fn = parse_fn.with_body_line("}".to_string());
    }
    parse_fn = parse_fn.with_body_line("self.state.instruction_pointer = None;".to_string());
    parse_fn = parse_fn.with_body_line("crate::runtime::ParseResult::Done".to_string());
    class.functions.push(parse_fn);

    GeneratedParser { class, instructions }
}

/// A top-level item's own member (if any) plus, for a `Switch`, every
/// case item's member — switch cases are inlined `match` arms in the
/// generated `parse`/`serialize` bodies, so their fields live as plain
/// struct members alongside the discriminant's siblings, not as a
/// separate nested type.
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
    input_pointers: bool,
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
        TypeKind::Bytes | TypeKind::String if item.attributes.has(keys::LENGTH) => {
            let app_accessible = item.flags.has(ItemFlags::APPLICATION_ACCESSIBLE);
            if app_accessible {
                Some(MemberVariable::new(sanitize_field_name(item.id.name()), "Vec<u8>"))
            } else if input_pointers {
                Some(MemberVariable::new(sanitize_field_name(item.id.name()), "crate::runtime::VarStreamRange"))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Per-field parser code.
fn generate_field_instruction(
    ast: &Ast,
    item_id: crate::models::arena::ItemId,
    label: u32,
    store_parsing_only: bool,
    input_pointers: bool,
    cross_refs: &FxHashSet<String>,
) -> Vec<String> {
    let item = ast.item(item_id);
    match &item.kind {
        UnitItemKind::Field(FieldKind::AtomicType) => generate_atomic(ast, item_id, label, store_parsing_only, input_pointers, cross_refs),
        UnitItemKind::Field(FieldKind::Switch { discriminant, cases }) => {
            // Cases are inlined `match` arms under the switch's own
            // label: an `OUT_OF_DATA` return from inside a case resumes
            // the whole switch rather than a specific case arm (the flat
            // instruction scheme has one resume point per top-level
            // item; re-entering a case arm is idempotent as long as case
            // items don't mutate state before they can fail, which holds
            // for the atomic/bytes lowerings here).
            let rendered_disc = crate::services::expr_codegen::render_int_expr(ast, *discriminant);
            let mut lines = vec![format!("match {rendered_disc} {{")];
            for case in cases {
                let labels: Vec<String> = case.labels.iter().map(|&l| crate::services::expr_codegen::render_int_expr(ast, l)).collect();
                let pattern = if labels.is_empty() { "_".to_string() } else { labels.join(" | ") };
                lines.push(format!("    {pattern} => {{"));
                for &case_item in &case.items {
                    for line in generate_field_instruction(ast, case_item, label, store_parsing_only, input_pointers, cross_refs) {
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
        UnitItemKind::Variable => vec!["// variables are computed, not parsed".to_string()],
        UnitItemKind::Property { .. } => vec![],
    }
}

fn generate_atomic(
    ast: &Ast,
    item_id: crate::models::arena::ItemId,
    label: u32,
    store_parsing_only: bool,
    input_pointers: bool,
    cross_refs: &FxHashSet<String>,
) -> Vec<String> {
    let item = ast.item(item_id);
    let ty_kind = &ast.ty(item.serialized_type()).kind;
    match ty_kind {
        TypeKind::Integer { width, signed } => {
            let big_endian = resolve_byte_order(ast, item_id);
            let fn_name = match (width, signed) {
                (8, false) => "parse_u8",
                (8, true) => "parse_i8",
                (16, false) => "parse_u16",
                (16, true) => "parse_i16",
                (32, false) => "parse_u32",
                (32, true) => "parse_i32",
                (64, false) => "parse_u64",
                (64, true) => "parse_i64",
                _ => "parse_u64",
            };
            let mut lines = vec![format!(
                "let Some(value) = crate::runtime::{fn_name}(cursor, {big_endian}) else {{ self.state.instruction_pointer = Some({label}); return crate::runtime::ParseResult::OutOfData; }};"
            )];
            if is_stored(ast, item_id, store_parsing_only, cross_refs) {
                lines.push(format!("self.{} = value;", sanitize_field_name(item.id.name())));
            }
            lines
        }
        TypeKind::Bytes | TypeKind::String => {
            if let Some(length_expr) = item.attributes.value_of(keys::LENGTH) {
                let rendered_len = crate::services::expr_codegen::render_int_expr(ast, length_expr);
                let field = sanitize_field_name(item.id.name());
                let app_accessible = item.flags.has(ItemFlags::APPLICATION_ACCESSIBLE);
                let mut lines = vec![
                    format!("let __len = ({rendered_len}) as usize;"),
                    format!(
                        "let Some(__bytes) = cursor.take(__len) else {{ self.state.instruction_pointer = Some({label}); return crate::runtime::ParseResult::OutOfData; }};"
                    ),
                ];
                if app_accessible {
                    // Application-accessible: allocate `__len` bytes in
                    // the area, copy, and keep an owned copy as storage.
                    lines.push("let mut __offset = 0usize;".to_string());
                    lines.push(format!(
                        "if !area.allocate(__len, &mut __offset) {{ self.state.instruction_pointer = Some({label}); return crate::runtime::ParseResult::AreaFull; }}"
                    ));
                    lines.push("area.bytes_mut(__offset, __len).copy_from_slice(__bytes);".to_string());
                    lines.push(format!("self.{field} = area.bytes(__offset, __len).to_vec();"));
                } else if input_pointers {
                    // `--input_pointers`: record a borrowed range instead
                    // of copying into the area.
                    lines.push(format!(
                        "self.{field} = crate::runtime::VarStreamRange {{ offset: cursor.pos - __len, len: __len }};"
                    ));
                } else {
                    lines.push("let _ = __bytes; // not application-accessible: advance past the field without copying".to_string());
                }
                lines
            } else {
                vec!["// Bytes/String without a length: until/eod variants are reserved".to_string()]
            }
        }
        _ => vec!["// atomic type without a dedicated lowering: reserved".to_string()],
    }
}

fn sanitize_field_name(name: &str) -> String {
    name.replace(['-', ' '], "_")
}
