//! The data model shared by every compiler pass: a typed, arena-backed
//! AST with scope handles and parent/child navigation.

pub mod arena;
pub mod ast;
pub mod attribute;
pub mod dependency;
pub mod error;
pub mod expr;
pub mod id;
pub mod location;
pub mod module;
pub mod scope;
pub mod types;
pub mod unit;
