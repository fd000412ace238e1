//! Error taxonomy for the PDF core.
//!
//! Every failure surfaced by the tokenizer, parser, document loader, filter
//! pipeline, and page walker falls into exactly one of three disjoint kinds.
//! The kinds exist for diagnostic purposes, not recovery: the core never
//! catches its own errors, it only raises them. The CLI front-end is the one
//! place that catches a [`PdfError`] and turns it into a process exit code.

use thiserror::Error;

/// The universal error type for the PDF core.
///
/// # Kinds
///
/// - [`PdfError::Conformance`]: the input violates ISO 32000-2.
/// - [`PdfError::NotSupported`]: the input is valid PDF but exercises a
///   feature this core does not implement (encryption, incremental updates,
///   cross-reference streams, object streams, unimplemented filters).
/// - [`PdfError::Bug`]: an invariant the implementation itself is supposed
///   to guarantee was violated. Distinguished from `Conformance` so a
///   reviewer never mistakes "we have a bug" for "the input is malformed".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PdfError {
    #[error("conformance violation: {0}")]
    Conformance(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("internal bug: {0}")]
    Bug(String),
}

impl PdfError {
    pub fn conformance(msg: impl Into<String>) -> Self {
        PdfError::Conformance(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        PdfError::NotSupported(msg.into())
    }

    pub fn bug(msg: impl Into<String>) -> Self {
        PdfError::Bug(msg.into())
    }

    /// Exit code the CLI front-end maps this error kind to.
    pub fn exit_code(&self) -> i32 {
        match self {
            PdfError::Conformance(_) => 1,
            PdfError::NotSupported(_) => 2,
            PdfError::Bug(_) => 3,
        }
    }
}

pub type PdfResult<T> = Result<T, PdfError>;
