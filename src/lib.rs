//! # deckstamp
//!
//! Run-aware placeholder substitution and media replacement for PowerPoint
//! slide-deck templates.
//!
//! A `.pptx` template is an OPC package: a ZIP archive of XML parts wired
//! together by relationship tables. This crate rewrites such a template
//! safely:
//!
//! - **Token substitution** finds `{{FIELD}}` placeholders even when the
//!   editor split them across `<a:r>` formatting runs, by searching the
//!   slide's rendered text rather than its serialized markup.
//! - **Media replacement** follows each slide's relationship table to the
//!   image part it actually displays, never guessing from filenames.
//! - **Repackaging** raw-copies every untouched archive entry, so parts the
//!   engine never modified survive byte-for-byte.
//!
//! # Example
//!
//! ```no_run
//! use deckstamp::{ReplacementRecord, TemplateEngine};
//!
//! # fn main() -> deckstamp::Result<()> {
//! let engine = TemplateEngine::standard();
//! let record = ReplacementRecord::new()
//!     .set("NAME", "Ana Souza")
//!     .set("COMPANY", "Acme");
//!
//! let result = engine.generate("template.pptx", &record, None)?;
//! std::fs::write("out.pptx", &result.bytes)?;
//!
//! if !result.report.is_clean() {
//!     eprintln!("{} tokens left unresolved", result.report.total_unresolved());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod opc;
pub mod template;

pub use error::{Result, TemplateError};
pub use template::{
    GenerationResult, MediaBinding, PlaceholderSurvey, ReplacementRecord, RunOutcome,
    SubstitutionReport, TemplateEngine, TokenSet,
};
