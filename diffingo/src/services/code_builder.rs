//! C2 — Source-Code Builder.
//!
//! A language-agnostic model of classes, functions, enums, and member
//! variables, with a pretty-printer that emits a header/implementation
//! pair. Treated as the code emitters' backend collaborator.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone)]
pub struct MemberVariable {
    pub name: String,
    pub ty: String,
    pub visibility: Visibility,
    pub default: Option<String>,
}

impl MemberVariable {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            visibility: Visibility::Public,
            default: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, String)>,
    pub return_type: String,
    pub body: Vec<String>,
    pub doc: Option<String>,
    /// Whether the receiver is `&mut self` rather than `&self`. The
    /// resumable `parse`/`serialize` entry points write into `self`
    /// (stored field values, the parser state's instruction pointer) and
    /// need the mutable receiver; most other methods don't.
    pub mutates_self: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: return_type.into(),
            body: Vec::new(),
            doc: None,
            mutates_self: false,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push((name.into(), ty.into()));
        self
    }

    pub fn with_body_line(mut self, line: impl Into<String>) -> Self {
        self.body.push(line.into());
        self
    }

    pub fn mutating(mut self) -> Self {
        self.mutates_self = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct EnumModel {
    pub name: String,
    pub variants: Vec<(String, Option<i64>)>,
}

/// A class/struct in the target language: member variables, methods, and
/// the names of base classes it depends on (used for declaration
/// ordering, see `sort_classes_by_dependency`).
#[derive(Debug, Clone)]
pub struct ClassModel {
    pub name: String,
    pub bases: Vec<String>,
    pub members: Vec<MemberVariable>,
    pub functions: Vec<Function>,
    pub nested_enums: Vec<EnumModel>,
    pub doc: Option<String>,
}

impl ClassModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            members: Vec::new(),
            functions: Vec::new(),
            nested_enums: Vec::new(),
            doc: None,
        }
    }

    /// Bases this class depends on for declaration-ordering purposes.
    /// Excludes bases whose name starts with `Q` from the dependency set
    /// (those are assumed forward-declarable / externally defined).
    pub fn dependencies(&self) -> Vec<&str> {
        self.bases
            .iter()
            .filter(|base| !base.starts_with('Q'))
            .map(String::as_str)
            .collect()
    }
}

/// Topologically orders classes so that each class is emitted after the
/// bases it depends on (ignoring bases excluded by `dependencies()`).
/// Falls back to input order for any cycle (wire-format units don't
/// recurse structurally, so cycles should not occur in practice).
pub fn sort_classes_by_dependency(classes: Vec<ClassModel>) -> Vec<ClassModel> {
    let names: Vec<String> = classes.iter().map(|c| c.name.clone()).collect();
    let mut emitted: Vec<bool> = vec![false; classes.len()];
    let mut order = Vec::with_capacity(classes.len());

    for _ in 0..classes.len() {
        let mut progressed = false;
        for (i, class) in classes.iter().enumerate() {
            if emitted[i] {
                continue;
            }
            let deps_satisfied = class.dependencies().iter().all(|dep| {
                match names.iter().position(|n| n == dep) {
                    Some(j) => emitted[j],
                    None => true, // external base, not one of ours
                }
            });
            if deps_satisfied {
                order.push(i);
                emitted[i] = true;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    // Anything left (a cycle) is appended in original order.
    for (i, done) in emitted.iter().enumerate() {
        if !done {
            order.push(i);
        }
    }

    let mut classes: Vec<Option<ClassModel>> = classes.into_iter().map(Some).collect();
    order
        .into_iter()
        .map(|i| classes[i].take().expect("each index emitted once"))
        .collect()
}

/// Pretty-printer producing a `(header, implementation)` source text
/// pair, mirroring the libkode-derived backend's header/impl split.
pub struct Printer {
    pub generator_stamp: String,
    pub license_block: Option<String>,
}

impl Printer {
    pub fn new(generator_stamp: impl Into<String>) -> Self {
        Self {
            generator_stamp: generator_stamp.into(),
            license_block: None,
        }
    }

    pub fn print(&self, namespace: &str, classes: &[ClassModel]) -> (String, String) {
        let classes_sorted = sort_classes_by_dependency(classes.to_vec());

        let mut header = String::new();
        self.write_preamble(&mut header);
        let _ = writeln!(header, "pub mod {namespace} {{");
        let _ = writeln!(header, "    use super::*;");
        for class in &classes_sorted {
            self.print_class_decl(&mut header, class);
        }
        let _ = writeln!(header, "}}");

        let mut imp = String::new();
        self.write_preamble(&mut imp);
        let _ = writeln!(imp, "use super::{namespace}::*;");
        for class in &classes_sorted {
            self.print_class_impl(&mut imp, class);
        }

        (header, imp)
    }

    fn write_preamble(&self, out: &mut String) {
        let _ = writeln!(out, "// {}", self.generator_stamp);
        if let Some(license) = &self.license_block {
            for line in license.lines() {
                let _ = writeln!(out, "// {line}");
            }
        }
    }

    fn print_class_decl(&self, out: &mut String, class: &ClassModel) {
        if let Some(doc) = &class.doc {
            let _ = writeln!(out, "    /// {doc}");
        }
        let _ = writeln!(out, "    #[derive(Debug, Clone)]");
        let _ = writeln!(out, "    pub struct {} {{", class.name);
        for member in &class.members {
            let vis = match member.visibility {
                Visibility::Public => "pub ",
                Visibility::Private => "",
            };
            let _ = writeln!(out, "        {vis}{}: {},", member.name, member.ty);
        }
        let _ = writeln!(out, "    }}");
        if !class.functions.is_empty() {
            let _ = writeln!(out, "    impl {} {{", class.name);
            for func in &class.functions {
                self.print_function_signature(out, func, "        ");
                let _ = writeln!(out, ";");
            }
            let _ = writeln!(out, "    }}");
        }
        for e in &class.nested_enums {
            self.print_enum(out, e);
        }
    }

    fn print_function_signature(&self, out: &mut String, func: &Function, indent: &str) {
        let params = func
            .params
            .iter()
            .map(|(n, t)| format!("{n}: {t}"))
            .collect::<Vec<_>>()
            .join(", ");
        let receiver = if func.mutates_self { "&mut self" } else { "&self" };
        let _ = write!(
            out,
            "{indent}pub fn {}({receiver}, {params}) -> {}",
            func.name, func.return_type
        );
    }

    fn print_class_impl(&self, out: &mut String, class: &ClassModel) {
        if class.functions.is_empty() {
            return;
        }
        let _ = writeln!(out, "impl {} {{", class.name);
        for func in &class.functions {
            self.print_function_signature(out, func, "    ");
            let _ = writeln!(out, " {{");
            for line in &func.body {
                let _ = writeln!(out, "        {line}");
            }
            let _ = writeln!(out, "    }}");
        }
        let _ = writeln!(out, "}}");
    }

    fn print_enum(&self, out: &mut String, e: &EnumModel) {
        let _ = writeln!(out, "    #[derive(Debug, Clone, Copy, PartialEq, Eq)]");
        let _ = writeln!(out, "    pub enum {} {{", e.name);
        for (name, value) in &e.variants {
            match value {
                Some(v) => {
                    let _ = writeln!(out, "        {name} = {v},");
                }
                None => {
                    let _ = writeln!(out, "        {name},");
                }
            }
        }
        let _ = writeln!(out, "    }}");
    }
}
