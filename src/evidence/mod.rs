//! Evidence intake and quote normalization
//!
//! Extracted claims arrive as JSON from the extraction service. This module
//! turns them into [`EvidenceItem`](crate::domain::EvidenceItem)s and reduces
//! their quotes to canonical search keys.
//!
//! # Example
//!
//! ```
//! use citemark::evidence::{parse_evidence, QuoteIndex};
//!
//! let raw = r#"{"Finance Date": {"value": "15-01-2025",
//!     "verbatim_quote": "Finance   Date:\n15/01/2025", "page_number": 1}}"#;
//! let evidence = parse_evidence(raw).unwrap();
//! let index = QuoteIndex::build(&evidence);
//! assert_eq!(index.labels("finance date: 15/01/2025"), ["Finance Date".to_string()]);
//! ```

pub mod intake;
pub mod normalize;

pub use intake::{parse_evidence, parse_extraction_response, strip_code_fence, IntakeError};
pub use normalize::{normalize_quote, QuoteIndex};
