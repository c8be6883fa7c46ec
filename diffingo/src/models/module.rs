//! `Module` and `Declaration`.

use crate::models::arena::{DeclId, ExprId, ScopeId, TypeId};
use crate::models::attribute::AttributeMap;
use crate::models::id::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    Exported,
    Private,
    Imported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantiationItem {
    /// Dotted/ID path into the referenced unit that the application
    /// reads or writes, e.g. `opcode`, `key`.
    pub path: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitInstantiation {
    pub id: Id,
    /// Unresolved until C4 runs; see `resolve` step (c).
    pub unit_ref: Id,
    pub unit: Option<TypeId>,
    pub items: Vec<InstantiationItem>,
    /// Populated by the dependency analyser (C7).
    pub dependencies: Vec<crate::models::dependency::Dependency>,
    /// Populated by the type compacter (C8).
    pub compacted_units: Vec<DeclId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeclPayload {
    Constant(ExprId),
    Function { result: TypeId, params: Vec<(Id, TypeId)>, body: Option<ExprId> },
    Transform { from: TypeId, to: TypeId },
    Type(TypeId),
    UnitInstantiation(UnitInstantiation),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub id: Id,
    pub linkage: Linkage,
    pub payload: DeclPayload,
}

impl Declaration {
    pub fn is_imported(&self) -> bool {
        matches!(self.linkage, Linkage::Imported)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: Id,
    pub properties: AttributeMap,
    pub declarations: Vec<DeclId>,
    pub scope: ScopeId,
}

impl Module {
    pub fn new(id: Id, scope: ScopeId) -> Self {
        Self {
            id,
            properties: AttributeMap::new(),
            declarations: Vec::new(),
            scope,
        }
    }

    /// Included files' declarations are merged by prepending.
    pub fn prepend_declarations(&mut self, mut decls: Vec<DeclId>) {
        decls.extend(std::mem::take(&mut self.declarations));
        self.declarations = decls;
    }
}
