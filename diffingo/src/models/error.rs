//! Consolidated error type for the diffingo compiler.
//!
//! Runtime back-pressure codes (`OUT_OF_DATA`, `AREA_FULL`,
//! `OUT_BUF_FULL`) are *not* part of this type: those are ordinary
//! return values the generated code's caller is expected to act on, not
//! compiler failures. See `services::parser_codegen` /
//! `services::serializer_codegen` for those result enums.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::id::Id;
use crate::models::location::Location;

#[derive(Error, Debug)]
pub enum DiffingoError {
    #[error("parse error in {file}: {message}")]
    SurfaceParseError { file: PathBuf, message: String },

    #[error("unresolved identifier `{id}`{}", at_suffix(.location))]
    UnresolvedIdentifier { id: Id, location: Option<Location> },

    #[error("multiply-defined identifier `{id}`{}", at_suffix(.location))]
    MultiplyDefinedIdentifier { id: Id, location: Option<Location> },

    #[error("lambda variable `{id}` used outside of a Find expression")]
    LambdaOutsideFind { id: Id },

    #[error("unit instantiation `{id}` does not resolve to a unit type")]
    InstantiationNotAUnit { id: Id },

    #[error("attribute `{key}` on `{item}` must be an identifier or type expression, found something else")]
    InvalidAttributeType { key: String, item: Id },

    #[error("unexpected placeholder type `{kind}` survived into code generation for `{item}`")]
    UnexpectedPlaceholderType { kind: String, item: Id },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn at_suffix(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!(" at {loc}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, DiffingoError>;

/// Accumulates per-pass error counts so the driver can stop before the
/// next pass runs: a pass returns failure if its error counter is
/// non-zero.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<DiffingoError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: DiffingoError) {
        tracing::error!(%error, "pass reported an error");
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[DiffingoError] {
        &self.errors
    }

    pub fn into_result(self) -> Result<()> {
        match self.errors.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_surfaces_first_error() {
        let mut diag = Diagnostics::new();
        assert!(!diag.has_errors());
        diag.report(DiffingoError::UnresolvedIdentifier {
            id: Id::new("foo"),
            location: None,
        });
        assert!(diag.has_errors());
        assert!(diag.into_result().is_err());
    }
}
