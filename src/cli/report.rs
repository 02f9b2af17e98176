//! Human and JSON renderings of a verification run.

use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{CitationMap, CitationRecord, EvidenceItem, Status};

/// One report line for a label's value
///
/// Verified values carry their page, unverified ones the claimed page marked
/// as approximate, and anything without a page is flagged.
pub fn status_line(value: Option<&str>, record: &CitationRecord) -> String {
    let value = value.unwrap_or("N/A");
    match (record.page, record.status) {
        (Some(page), Status::Verified) => format!("✅ {} (Pg {})", value, page),
        (Some(page), Status::Unverified) => format!("⚠️ {} (Approx Pg {})", value, page),
        (Some(page), Status::Missing) => format!("{} (Pg {})", value, page),
        (None, _) => format!("{} ❌", value),
    }
}

/// Per-label report in evidence order
pub fn render_report(evidence: &[EvidenceItem], citations: &CitationMap) -> String {
    let mut out = String::new();
    for item in evidence {
        let record = citations
            .get(&item.label)
            .copied()
            .unwrap_or_else(CitationRecord::missing);
        out.push_str(&format!("{}\n  {}\n", item.label, status_line(item.value.as_deref(), &record)));
    }
    out
}

/// Machine-readable run summary
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub run_id: Uuid,
    pub document: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_error: Option<String>,
    pub pages: usize,
    pub citations: &'a CitationMap,
}
