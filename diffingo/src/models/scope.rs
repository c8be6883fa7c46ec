//! `Scope`: lexical name resolution with parent chaining and nested
//! child scopes.

use crate::models::arena::{Arena, ExprId, ScopeId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A value bound to a name: typically a reference to a resolved
/// `Type`/`Function`/`Transform`/`ParserState` expression.
pub type ScopeValue = ExprId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// Multi-valued per name (append, never replace) — this is why
    /// "multiple bindings" is a resolver error rather than silent
    /// shadowing (original source: `Scope::insert`).
    values: FxHashMap<String, Vec<ScopeValue>>,
    children: FxHashMap<String, ScopeId>,
    /// The scope's own name, used to strip a leading self-reference
    /// during lookup (e.g. `Unit::field` looked up from within `Unit`'s
    /// own scope should try `field` directly too).
    pub own_name: Option<String>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            values: FxHashMap::default(),
            children: FxHashMap::default(),
            own_name: None,
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ScopeValue) {
        self.values.entry(name.into()).or_default().push(value);
    }

    pub fn add_child(&mut self, name: impl Into<String>, scope: ScopeId) {
        self.children.insert(name.into(), scope);
    }

    pub fn child(&self, name: &str) -> Option<ScopeId> {
        self.children.get(name).copied()
    }

    /// Direct (non-traversing) lookup by exact name.
    pub fn local(&self, name: &str) -> Option<&[ScopeValue]> {
        self.values.get(name).map(Vec::as_slice)
    }
}

/// Arena of scopes plus the lookup algorithm.
///
/// Lookup order:
/// 1. A direct lookup of the full path as a single joined key.
/// 2. If the path's leading component case-insensitively matches the
///    scope's own name, drop it and retry.
/// 3. If exactly one component remains, look it up directly.
/// 4. Otherwise try successively longer left-anchored subpaths against
///    child scopes, most specific first, and recurse into the matching
///    child with the remaining suffix.
/// 5. If nothing matches and `traverse` is set, retry from the parent
///    scope.
pub struct ScopeTable<'a> {
    pub scopes: &'a Arena<Scope>,
}

impl<'a> ScopeTable<'a> {
    pub fn find(&self, scope: ScopeId, path: &[String], traverse: bool) -> Vec<ScopeValue> {
        self.find_in(scope, path, traverse)
    }

    fn find_in(&self, scope_id: ScopeId, path: &[String], traverse: bool) -> Vec<ScopeValue> {
        if path.is_empty() {
            return Vec::new();
        }

        let scope = self.scopes.get(scope_id.0);

        // (1) direct full-path lookup
        let joined = path.join("::");
        if let Some(values) = scope.local(&joined) {
            return values.to_vec();
        }

        // (2) drop a self-referential leading component
        let mut rest = path;
        if let Some(own) = &scope.own_name {
            if rest[0].eq_ignore_ascii_case(own) {
                rest = &rest[1..];
            }
        }
        if rest.is_empty() {
            return Vec::new();
        }

        // (3) single remaining component: direct lookup
        if rest.len() == 1 {
            if let Some(values) = scope.local(&rest[0]) {
                return values.to_vec();
            }
        }

        // (4) left-anchored subpaths against child scopes, most specific first
        for split in (1..=rest.len()).rev() {
            let prefix = rest[..split].join("::");
            if let Some(child) = scope.child(&prefix) {
                let found = self.find_in(child, &rest[split..], traverse);
                if !found.is_empty() {
                    return found;
                }
            }
        }

        // (5) climb to the parent scope
        if traverse {
            if let Some(parent) = scope.parent {
                return self.find_in(parent, path, traverse);
            }
        }

        Vec::new()
    }
}
