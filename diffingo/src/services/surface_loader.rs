//! Surface file loading (`--file|-f`).
//!
//! The grammar-level wire-format surface syntax (`unit Foo { ... }`,
//! `%length = ...`) is out of scope here; `pipeline::compile` wants an
//! already-built `Ast` plus the declaration list `scope_builder` binds
//! into a module. This module is the documented stand-in for that front
//! end: a JSON document whose shape mirrors the arena types directly,
//! produced by any tool (or by hand, for small fixtures) that wants to
//! drive the compiler without writing a dedicated parser.
//!
//! A real grammar-based front end would sit entirely in front of this
//! module and produce the same `SurfaceFile` shape; nothing downstream
//! of `load` would need to change.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::arena::{DeclId, ExprId};
use crate::models::ast::Ast;
use crate::models::error::Result;
use crate::models::id::Id;

/// One `(name, value expression, declaration)` triple, bound into the
/// module scope by `scope_builder::build_module`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceDeclaration {
    pub name: String,
    pub value: ExprId,
    pub decl: DeclId,
}

/// The on-disk shape `--file` reads: a pre-built arena plus the handful
/// of facts `scope_builder`/`pipeline` need that an `Ast` alone doesn't
/// carry (the module's own name, its top-level declaration bindings,
/// and which `UnitInstantiation` to compile).
#[derive(Debug, Serialize, Deserialize)]
pub struct SurfaceFile {
    pub ast: Ast,
    pub module: String,
    pub declarations: Vec<SurfaceDeclaration>,
    pub instantiation: String,
}

pub struct Loaded {
    pub ast: Ast,
    pub module_id: Id,
    pub declarations: Vec<(Id, ExprId, DeclId)>,
    pub instantiation: Id,
}

pub fn load(path: &Path) -> Result<Loaded> {
    let text = std::fs::read_to_string(path)?;
    let file: SurfaceFile = serde_json::from_str(&text)?;
    let declarations = file
        .declarations
        .into_iter()
        .map(|d| (Id::parse(&d.name), d.value, d.decl))
        .collect();
    Ok(Loaded {
        ast: file.ast,
        module_id: Id::parse(&file.module),
        declarations,
        instantiation: Id::parse(&file.instantiation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::module::{DeclPayload, Declaration, Linkage};
    use crate::models::types::{TypeKind, TypeNode};
    use std::io::Write;

    #[test]
    fn loads_a_minimal_surface_file() {
        let mut ast = Ast::new();
        let ty = ast.push_type(TypeNode::new(TypeKind::Integer { width: 16, signed: false }));
        let expr = ast.push_expr(crate::models::expr::ExprNode::new(crate::models::expr::ExprKind::Type(ty)));
        let decl = ast.push_decl(Declaration { id: Id::new("Count"), linkage: Linkage::Exported, payload: DeclPayload::Type(ty) });

        let file = SurfaceFile {
            ast,
            module: "Mod".to_string(),
            declarations: vec![SurfaceDeclaration { name: "Count".to_string(), value: expr, decl }],
            instantiation: "Count".to_string(),
        };
        let json = serde_json::to_string(&file).expect("surface file serializes");

        let mut tmp = tempfile::NamedTempFile::new().expect("tempfile");
        tmp.write_all(json.as_bytes()).expect("write fixture");

        let loaded = load(tmp.path()).expect("surface file loads back");
        assert_eq!(loaded.module_id, Id::new("Mod"));
        assert_eq!(loaded.declarations.len(), 1);
        assert_eq!(loaded.instantiation, Id::new("Count"));
    }
}
