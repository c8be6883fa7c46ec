//! `Ast`: the arenas that back every node family, plus the small set of
//! cross-cutting helpers passes share (node construction, scope lookup,
//! replace-in-place).

use crate::models::arena::{Arena, DeclId, ExprId, ItemId, ModuleId, ScopeId, TypeId};
use crate::models::expr::ExprNode;
use crate::models::module::{Declaration, Module};
use crate::models::scope::{Scope, ScopeTable, ScopeValue};
use crate::models::types::{TypeNode, TypeTable};
use crate::models::unit::UnitItemNode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Ast {
    pub types: Arena<TypeNode>,
    pub exprs: Arena<ExprNode>,
    pub items: Arena<UnitItemNode>,
    pub decls: Arena<Declaration>,
    pub modules: Arena<Module>,
    pub scopes: Arena<Scope>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_type(&mut self, node: TypeNode) -> TypeId {
        TypeId(self.types.push(node))
    }

    pub fn push_expr(&mut self, node: ExprNode) -> ExprId {
        ExprId(self.exprs.push(node))
    }

    pub fn push_item(&mut self, node: UnitItemNode) -> ItemId {
        ItemId(self.items.push(node))
    }

    pub fn push_decl(&mut self, node: Declaration) -> DeclId {
        DeclId(self.decls.push(node))
    }

    pub fn push_module(&mut self, node: Module) -> ModuleId {
        ModuleId(self.modules.push(node))
    }

    pub fn push_scope(&mut self, node: Scope) -> ScopeId {
        ScopeId(self.scopes.push(node))
    }

    pub fn ty(&self, id: TypeId) -> &TypeNode {
        self.types.get(id.0)
    }

    pub fn ty_mut(&mut self, id: TypeId) -> &mut TypeNode {
        self.types.get_mut(id.0)
    }

    pub fn expr(&self, id: ExprId) -> &ExprNode {
        self.exprs.get(id.0)
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut ExprNode {
        self.exprs.get_mut(id.0)
    }

    pub fn item(&self, id: ItemId) -> &UnitItemNode {
        self.items.get(id.0)
    }

    pub fn item_mut(&mut self, id: ItemId) -> &mut UnitItemNode {
        self.items.get_mut(id.0)
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        self.decls.get(id.0)
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Declaration {
        self.decls.get_mut(id.0)
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        self.modules.get(id.0)
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        self.modules.get_mut(id.0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        self.scopes.get(id.0)
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.scopes.get_mut(id.0)
    }

    /// Replace an expression node in place: every existing `ExprId` equal
    /// to `id` now observes `node`.
    pub fn replace_expr(&mut self, id: ExprId, node: ExprNode) {
        self.exprs.replace(id.0, node);
    }

    pub fn replace_type(&mut self, id: TypeId, node: TypeNode) {
        self.types.replace(id.0, node);
    }

    pub fn scope_table(&self) -> ScopeTable<'_> {
        ScopeTable { scopes: &self.scopes }
    }

    pub fn type_table(&self) -> TypeTable<'_> {
        TypeTable { types: &self.types }
    }

    pub fn resolve(&self, scope: ScopeId, path: &[String], traverse: bool) -> Vec<ScopeValue> {
        self.scope_table().find(scope, path, traverse)
    }
}
