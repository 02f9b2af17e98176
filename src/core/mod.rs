//! Core verification logic.
//!
//! This module contains:
//! - Locator: overlapping occurrence search with geometry recovery
//! - Grouper: glyph boxes to per-line highlight quads
//! - Resolver: match table and claimed pages to citation records
//! - Engine: the end-to-end verification run
//! - Ledger: append-only record of CLI runs

pub mod engine;
pub mod grouper;
pub mod ledger;
pub mod locator;
pub mod resolver;

// Re-export commonly used types
pub use engine::{Analysis, Engine, EngineError, EngineSettings, Verification};
pub use grouper::{group_lines, DEFAULT_LINE_TOLERANCE};
pub use ledger::{compute_hash, Ledger, LedgerEntry};
pub use locator::{find_overlapping, locate, Occurrence};
pub use resolver::resolve;
