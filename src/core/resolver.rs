//! Reduction of match evidence and claimed pages into citation records.

use tracing::debug;

use crate::domain::{CitationMap, CitationRecord, EvidenceItem, MatchTable};
use crate::evidence::QuoteIndex;

/// Resolve one citation record per label.
///
/// A label whose quote matched anywhere is verified at the lowest matching
/// page. Otherwise a usable claimed page makes it unverified at that page;
/// failing both it is missing. The result does not depend on the order in
/// which matches were collected.
pub fn resolve(matches: &MatchTable, quotes: &QuoteIndex, evidence: &[EvidenceItem]) -> CitationMap {
    let mut citations = CitationMap::new();

    for key in quotes.keys() {
        let Some(page) = matches.min_page_for(key) else {
            continue;
        };
        for label in quotes.labels(key) {
            // Pages are 0-based in the match table
            let record = CitationRecord::verified(page as u32 + 1);
            match citations.get(label) {
                Some(existing) if existing.page <= record.page => {}
                _ => {
                    citations.insert(label.clone(), record);
                }
            }
        }
    }

    for item in evidence {
        if citations.contains_key(&item.label) {
            continue;
        }
        let record = match item.claimed_page_number() {
            Some(page) => CitationRecord::unverified(page),
            None => CitationRecord::missing(),
        };
        debug!(label = %item.label, status = %record.status, "Resolved without a match");
        citations.insert(item.label.clone(), record);
    }

    citations
}
