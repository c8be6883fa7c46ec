//! Command-line options (spec §6): one invocation compiles one spec file.

use std::path::PathBuf;

use clap::Parser;

/// Compiles a declarative binary wire-format spec into parser/serializer
/// source for one unit instantiation.
#[derive(Parser, Debug)]
#[command(name = "diffingo", version, about = "Binary wire-format compiler")]
pub struct Args {
    /// The spec input file (spec §6: `--file|-f`, required).
    #[arg(short, long)]
    pub file: PathBuf,

    /// Namespace for emitted code (spec §6: `--namespace|-n`, required).
    #[arg(short, long)]
    pub namespace: String,

    /// Output directory; created if missing (spec §6: `--output|-o`, required).
    #[arg(short, long)]
    pub output: PathBuf,

    /// Dump the post-parse AST (spec §6: `--ast|-a`).
    #[arg(short, long, default_value_t = false)]
    pub ast: bool,

    /// Skip emitting the original unit types; emit only the compacted
    /// ones (spec §6: `--instantiation_only|-i`).
    #[arg(short = 'i', long, default_value_t = false)]
    pub instantiation_only: bool,

    /// For non-app-accessible byte fields, store stream range pointers
    /// instead of copying (spec §6: `--input_pointers|-p`).
    #[arg(short = 'p', long, default_value_t = false)]
    pub input_pointers: bool,

    /// Include parsing-only items in emitted structs (spec §6:
    /// `--store_parsing_only|-s`, default true). Pass
    /// `--no-store-parsing-only` to turn it back off.
    #[arg(short = 's', long = "store-parsing-only", default_value_t = true, overrides_with = "no_store_parsing_only")]
    store_parsing_only: bool,

    /// Turns `--store-parsing-only` back off.
    #[arg(long = "no-store-parsing-only", action = clap::ArgAction::SetTrue, overrides_with = "store_parsing_only")]
    no_store_parsing_only: bool,

    /// Which `UnitInstantiation` declaration in the spec file to compile.
    #[arg(long)]
    pub instantiation: String,
}

impl Args {
    /// Resolves `-s`/`--store-parsing-only` against a later
    /// `--no-store-parsing-only`, whichever was given last on the
    /// command line wins (spec §6 default: `true`).
    pub fn store_parsing_only(&self) -> bool {
        self.store_parsing_only && !self.no_store_parsing_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_flags() {
        let args = Args::parse_from([
            "diffingo",
            "-f",
            "spec.json",
            "-n",
            "demo",
            "-o",
            "out",
            "--instantiation",
            "Msg",
        ]);
        assert_eq!(args.file, PathBuf::from("spec.json"));
        assert_eq!(args.namespace, "demo");
        assert_eq!(args.output, PathBuf::from("out"));
        assert!(args.store_parsing_only());
        assert!(!args.ast);
        assert!(!args.instantiation_only);
        assert!(!args.input_pointers);
    }

    #[test]
    fn no_store_parsing_only_turns_the_default_off() {
        let args = Args::parse_from([
            "diffingo",
            "-f",
            "spec.json",
            "-n",
            "demo",
            "-o",
            "out",
            "--no-store-parsing-only",
            "--instantiation",
            "Msg",
        ]);
        assert!(!args.store_parsing_only());
    }

    #[test]
    fn short_flags_toggle_booleans() {
        let args = Args::parse_from([
            "diffingo",
            "-f",
            "spec.json",
            "-n",
            "demo",
            "-o",
            "out",
            "-a",
            "-i",
            "-p",
            "--instantiation",
            "Msg",
        ]);
        assert!(args.ast);
        assert!(args.instantiation_only);
        assert!(args.input_pointers);
    }
}
