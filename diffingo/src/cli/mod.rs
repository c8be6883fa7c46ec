//! CLI driver. Wires `args` parsing to the pipeline
//! (`services::pipeline::compile`) and writes the generated header/impl
//! pair to the output directory, keeping `bin/*.rs` thin and the real
//! work here.

pub mod args;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::error::DiffingoError;
use crate::services::{pipeline, surface_loader};

pub use args::Args;

/// Runs one compilation as described by `args`. Returns an error for any
/// of: surface-file read/parse failure, file-open failure, or pass
/// failure — the first failing pass aborts the whole run.
pub fn run(args: &Args) -> Result<()> {
    tracing::info!(file = %args.file.display(), namespace = %args.namespace, "diffingo: compiling");

    let loaded = surface_loader::load(&args.file)
        .with_context(|| format!("loading surface file {}", args.file.display()))?;

    if args.ast {
        let dump = serde_json::to_string_pretty(&loaded.ast).context("serializing --ast dump")?;
        tracing::debug!("--ast requested, dumping post-parse AST");
        println!("{dump}");
    }

    let mut ast = loaded.ast;
    let opts = pipeline::CompileOptions {
        instantiation_only: args.instantiation_only,
        store_parsing_only: args.store_parsing_only(),
        input_pointers: args.input_pointers,
    };

    let instantiation = crate::models::id::Id::parse(&args.instantiation);
    let output = pipeline::compile(
        &mut ast,
        loaded.module_id,
        loaded.declarations,
        &instantiation,
        &args.namespace,
        opts,
    )
    .map_err(|err: DiffingoError| anyhow::anyhow!(err))
    .with_context(|| format!("compiling instantiation `{}`", args.instantiation))?;

    let stem = args
        .file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&args.namespace);
    write_output(&args.output, stem, &output)?;

    Ok(())
}

fn write_output(dir: &Path, stem: &str, output: &pipeline::CompileOutput) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))?;

    let header_path = dir.join(format!("{stem}.h"));
    let impl_path = dir.join(format!("{stem}.cpp"));

    fs::write(&header_path, &output.header)
        .with_context(|| format!("writing {}", header_path.display()))?;
    fs::write(&impl_path, &output.implementation)
        .with_context(|| format!("writing {}", impl_path.display()))?;

    tracing::info!(header = %header_path.display(), implementation = %impl_path.display(), "diffingo: wrote output");
    Ok(())
}
