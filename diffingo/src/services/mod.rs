//! The compilation pipeline, one module per pass. Passes run in the
//! fixed order `pipeline::compile` drives: C3 scope_builder, C4
//! id_resolver, C5 unit_scope_builder, C6 transform_resolver, C7
//! dependency_analyzer, C8 type_compacter, C9 parser_codegen, C10
//! serializer_codegen, with code_builder (C2) and field_factory
//! underneath several of them.

pub mod code_builder;
pub mod dependency_analyzer;
pub mod expr_codegen;
pub mod field_factory;
pub mod id_resolver;
pub mod parser_codegen;
pub mod pipeline;
pub mod scope_builder;
pub mod serializer_codegen;
pub mod surface_loader;
pub mod transform_resolver;
pub mod type_compacter;
pub mod unit_scope_builder;
