//! `ID`: an ordered sequence of name components, e.g. `Mod::Unit::field`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Most identifiers in a spec file are one to three components deep
/// (`Unit::field`, `Mod::Unit::field`); inline storage avoids a heap
/// allocation for the common case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id {
    components: SmallVec<[String; 4]>,
}

impl Id {
    pub fn new<S: Into<String>>(component: S) -> Self {
        Self {
            components: SmallVec::from_iter([component.into()]),
        }
    }

    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    pub fn parse(path: &str) -> Self {
        Self::from_components(path.split("::"))
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn name(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or("")
    }

    /// All but the last component, e.g. `Mod::Unit` for `Mod::Unit::field`.
    pub fn scope_path(&self) -> Id {
        let n = self.components.len();
        Id::from_components(self.components.iter().take(n.saturating_sub(1)).cloned())
    }

    pub fn path_as_string(&self) -> String {
        self.components.join("::")
    }

    /// `self` + `other`, e.g. `a` + `b::c` -> `a::b::c`.
    pub fn combine(&self, other: &Id) -> Id {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Id { components }
    }

    pub fn append<S: Into<String>>(&self, component: S) -> Id {
        let mut components = self.components.clone();
        components.push(component.into());
        Id { components }
    }

    pub fn is_prefix_of(&self, other: &Id) -> bool {
        if self.components.len() > other.components.len() {
            return false;
        }
        self.components
            .iter()
            .zip(other.components.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Drop the leading `n` components, e.g. stripping a module prefix.
    pub fn without_prefix(&self, n: usize) -> Id {
        Id::from_components(self.components.iter().skip(n).cloned())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_as_string())
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::parse(s)
    }
}
