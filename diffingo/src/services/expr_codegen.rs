//! Shared expression-to-Rust-source rendering used by C9 and C10 for the
//! handful of expression shapes that actually reach codegen: length
//! attributes (`length = key_len`, `length = total_len - key_len - extras_len`)
//! and switch discriminants (`switch(opcode)`). Full expression
//! evaluation (arbitrary `Function`/`Lambda`/`Find`) is out of scope —
//! anything outside the shapes below falls back to a `0` literal with a
//! comment, the same conservative stance C7 takes on unanalysed calls.

use rustc_hash::FxHashSet;

use crate::models::arena::{ExprId, ItemId};
use crate::models::ast::Ast;
use crate::models::attribute::keys;
use crate::models::expr::{Constant, ExprKind, OperatorKind};
use crate::models::unit::{FieldKind, UnitItemKind};

fn sanitize(name: &str) -> String {
    name.replace(['-', ' '], "_")
}

/// Renders a sibling-field reference (`Variable`/`MemberAttribute` whose
/// target bottoms out at the current unit) as `self.<field>`.
fn render_field_ref(ast: &Ast, expr_id: ExprId) -> Option<String> {
    match &ast.expr(expr_id).kind {
        ExprKind::Variable(id) => Some(format!("self.{}", sanitize(id.name()))),
        ExprKind::MemberAttribute { attribute, .. } => Some(format!("self.{}", sanitize(attribute.name()))),
        _ => None,
    }
}

/// Renders an arithmetic/reference expression (length attributes, switch
/// discriminants) to a Rust source snippet evaluating to an integer.
/// Falls back to a literal `0` with an inline comment for shapes this
/// compiler doesn't reduce to code (matches the conservative stance C7
/// takes on `Function`/`Lambda`).
pub fn render_int_expr(ast: &Ast, expr_id: ExprId) -> String {
    match &ast.expr(expr_id).kind {
        ExprKind::Constant(Constant::Integer(n)) => n.to_string(),
        ExprKind::Constant(Constant::Enum { value, .. }) => value.to_string(),
        ExprKind::Variable(_) | ExprKind::MemberAttribute { .. } => {
            render_field_ref(ast, expr_id).unwrap_or_else(|| "0 /* unresolved reference */".to_string())
        }
        ExprKind::Operator {
            kind: kind @ (OperatorKind::Plus | OperatorKind::Minus | OperatorKind::Mult | OperatorKind::Div | OperatorKind::Mod),
            operands,
        } => {
            let op = match kind {
                OperatorKind::Plus => "+",
                OperatorKind::Minus => "-",
                OperatorKind::Mult => "*",
                OperatorKind::Div => "/",
                OperatorKind::Mod => "%",
                _ => unreachable!(),
            };
            let rendered: Vec<String> = operands.iter().map(|&o| render_int_expr(ast, o)).collect();
            format!("({})", rendered.join(&format!(" {op} ")))
        }
        ExprKind::Operator { kind: OperatorKind::Attribute, operands } if operands.len() == 2 => {
            render_field_ref(ast, expr_id).unwrap_or_else(|| render_int_expr(ast, operands[1]))
        }
        _ => "0 /* expression shape not reducible to code */".to_string(),
    }
}

/// Reads a `%byteorder = ...` attribute value down to `true` (big) /
/// `false` (little). Recognizes the built-in `ByteOrder` enum constant
/// and a bare name reference (`ByteOrder::little`'s `MemberAttribute`
/// form, or a resolved `Variable`/`Id` ending in `little`/`big`).
/// Anything else is unrecognized; the caller defaults to big with a
/// warning per spec §4.8 item 5 / §7 item 5.
pub fn byte_order_is_big(ast: &Ast, expr_id: ExprId) -> Option<bool> {
    match &ast.expr(expr_id).kind {
        ExprKind::Constant(Constant::Enum { label, .. }) => match label.as_str() {
            "little" => Some(false),
            "big" => Some(true),
            _ => None,
        },
        ExprKind::MemberAttribute { attribute, .. } => match attribute.name() {
            "little" => Some(false),
            "big" => Some(true),
            _ => None,
        },
        ExprKind::Variable(id) => match id.name() {
            "little" => Some(false),
            "big" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Like `render_int_expr`, but for an expression expected to name a
/// sibling field (the rewrite target of a `length` attribute shaped as
/// `Attribute(self, sibling)`). Returns `None` when the expression isn't
/// a plain field reference.
pub fn render_field_target(ast: &Ast, expr_id: ExprId) -> Option<String> {
    render_field_ref(ast, expr_id)
}

/// Names of every field a `length` attribute or switch discriminant
/// points at, anywhere in `items` (recursing into switch cases). The
/// generated `parse`/`serialize` bodies lower each field to its own
/// `if resume_at <= label { ... }`/`match` block with its own locals, so
/// a field another field's expression depends on needs a real struct
/// slot to carry its value across blocks — independent of whether
/// `--store_parsing_only` asked to expose it to the application.
pub fn cross_referenced_field_names(ast: &Ast, items: &[ItemId]) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    for &item_id in items {
        collect_from_item(ast, item_id, &mut names);
    }
    names
}

fn collect_from_item(ast: &Ast, item_id: ItemId, out: &mut FxHashSet<String>) {
    let item = ast.item(item_id);
    if let Some(length_expr) = item.attributes.value_of(keys::LENGTH) {
        collect_names(ast, length_expr, out);
    }
    if let UnitItemKind::Field(FieldKind::Switch { discriminant, cases }) = &item.kind {
        collect_names(ast, *discriminant, out);
        for case in cases {
            for &case_item in &case.items {
                collect_from_item(ast, case_item, out);
            }
        }
    }
}

fn collect_names(ast: &Ast, expr_id: ExprId, out: &mut FxHashSet<String>) {
    match &ast.expr(expr_id).kind {
        ExprKind::Variable(id) => {
            out.insert(sanitize(id.name()));
        }
        ExprKind::MemberAttribute { attribute, .. } => {
            out.insert(sanitize(attribute.name()));
        }
        ExprKind::Operator { operands, .. } => {
            for &operand in operands {
                collect_names(ast, operand, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::expr::ExprNode;
    use crate::models::id::Id;

    #[test]
    fn renders_constant_integer() {
        let mut ast = Ast::new();
        let e = ast.push_expr(ExprNode::new(ExprKind::Constant(Constant::Integer(12))));
        assert_eq!(render_int_expr(&ast, e), "12");
    }

    #[test]
    fn renders_sibling_field_reference() {
        let mut ast = Ast::new();
        let e = ast.push_expr(ExprNode::new(ExprKind::Variable(Id::new("key_len"))));
        assert_eq!(render_int_expr(&ast, e), "self.key_len");
    }

    #[test]
    fn byte_order_reads_enum_label() {
        let mut ast = Ast::new();
        let little = ast.push_expr(ExprNode::new(ExprKind::Constant(Constant::Enum { label: "little".to_string(), value: 1 })));
        let big = ast.push_expr(ExprNode::new(ExprKind::Constant(Constant::Enum { label: "big".to_string(), value: 0 })));
        assert_eq!(byte_order_is_big(&ast, little), Some(false));
        assert_eq!(byte_order_is_big(&ast, big), Some(true));
    }

    #[test]
    fn byte_order_unrecognized_shape_is_none() {
        let mut ast = Ast::new();
        let e = ast.push_expr(ExprNode::new(ExprKind::Constant(Constant::Bool(true))));
        assert_eq!(byte_order_is_big(&ast, e), None);
    }

    #[test]
    fn renders_subtraction_chain() {
        let mut ast = Ast::new();
        let total = ast.push_expr(ExprNode::new(ExprKind::Variable(Id::new("total_len"))));
        let key = ast.push_expr(ExprNode::new(ExprKind::Variable(Id::new("key_len"))));
        let extras = ast.push_expr(ExprNode::new(ExprKind::Variable(Id::new("extras_len"))));
        let sub = ast.push_expr(ExprNode::new(ExprKind::Operator {
            kind: OperatorKind::Minus,
            operands: vec![total, key, extras],
        }));
        assert_eq!(render_int_expr(&ast, sub), "(self.total_len - self.key_len - self.extras_len)");
    }

    #[test]
    fn cross_referenced_names_finds_a_length_attributes_sibling() {
        use crate::models::attribute::Attribute;
        use crate::models::types::{TypeKind, TypeNode};
        use crate::models::unit::{FieldKind, UnitItemNode};

        let mut ast = Ast::new();
        let u16_ty = ast.push_type(TypeNode::new(TypeKind::Integer { width: 16, signed: false }));
        let bytes_ty = ast.push_type(TypeNode::new(TypeKind::Bytes));

        let key_len = ast.push_item(UnitItemNode::new(Id::new("key_len"), u16_ty, UnitItemKind::Field(FieldKind::AtomicType)));
        let len_ref = ast.push_expr(ExprNode::new(ExprKind::Variable(Id::new("key_len"))));
        let mut key = UnitItemNode::new(Id::new("key"), bytes_ty, UnitItemKind::Field(FieldKind::AtomicType));
        key.attributes.insert(Attribute::new(keys::LENGTH, Some(len_ref)));
        let key_id = ast.push_item(key);

        let names = cross_referenced_field_names(&ast, &[key_len, key_id]);
        assert!(names.contains("key_len"));
        assert!(!names.contains("key"));
    }
}
