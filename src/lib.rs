//! citemark - Evidence localization and highlight annotation for PDFs
//!
//! Checks AI-extracted claims against the document they were extracted
//! from. Every claimed verbatim quote is searched for in the document's
//! text layer, each located occurrence is highlighted in an annotated copy,
//! and every claim gets a citation record telling whether its quote was
//! found and on which page.
//!
//! # Architecture
//!
//! Matching is collect-then-reduce:
//! - Quotes are normalized into distinct whitespace/case-insensitive keys
//! - Every page is indexed and searched, collecting a document-wide match table
//! - Citation records are resolved from the full table: verified at the
//!   lowest matching page, else unverified at the claimed page, else missing
//!
//! # Modules
//!
//! - `layout`: PDF text layer (glyphs, fonts) and the per-page search index
//! - `evidence`: Evidence intake and quote normalization
//! - `core`: Locator, grouper, resolver, engine and run ledger
//! - `annotate`: Highlight annotation writer
//! - `domain`: Data structures (EvidenceItem, CitationRecord, MatchTable)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Verify an extraction response and write a highlighted copy
//! citemark verify contract.pdf --evidence extracted.json
//!
//! # Inspect the searchable text of page 3
//! citemark text contract.pdf --page 3 --normalized
//!
//! # List recent runs
//! citemark history
//! ```

pub mod annotate;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod evidence;
pub mod layout;

// Re-export main types at crate root for convenience
pub use self::core::{Engine, EngineError, EngineSettings, Verification};
pub use domain::{CitationMap, CitationRecord, EvidenceItem, MatchInstance, MatchTable, Status};
pub use evidence::{parse_evidence, IntakeError, QuoteIndex};
pub use layout::{LayoutError, LayoutNode, PdfDocument, TextLayer};
