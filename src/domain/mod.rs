//! Domain types for citemark.
//!
//! This module contains the core data structures:
//! - Evidence: AI-claimed fields to verify
//! - Citation: Resolved page and status per label
//! - Geometry: Glyph boxes and highlight quads
//! - Matches: Located quote occurrences

pub mod citation;
pub mod evidence;
pub mod geometry;
pub mod matches;

// Re-export commonly used types
pub use citation::{status_counts, CitationMap, CitationRecord, Status};
pub use evidence::{coerce_page, EvidenceItem};
pub use geometry::{quads_bounds, BBox, Quad};
pub use matches::{MatchInstance, MatchTable};
