pub mod core;

// Re-export main types for convenience
pub use core::{Document, DocumentSummary, Lexer, Object, ObjectId, PageTree, Parser, PdfError, PdfResult, Token, Version, XRefTable};
