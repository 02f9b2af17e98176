//! Citation records: the resolved `(page, status)` outcome per label.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Verification status of one label
///
/// Ordered by precedence: a verified label is never downgraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Quote found in the document's text layer
    Verified,
    /// Quote not found; the extractor's claimed page is used
    Unverified,
    /// Neither a located quote nor a usable claimed page
    Missing,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Verified => "verified",
            Status::Unverified => "unverified",
            Status::Missing => "missing",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved outcome for one label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// 1-based page number, if any
    pub page: Option<u32>,
    pub status: Status,
}

impl CitationRecord {
    pub fn verified(page: u32) -> Self {
        Self {
            page: Some(page),
            status: Status::Verified,
        }
    }

    pub fn unverified(page: u32) -> Self {
        Self {
            page: Some(page),
            status: Status::Unverified,
        }
    }

    pub fn missing() -> Self {
        Self {
            page: None,
            status: Status::Missing,
        }
    }
}

/// Label -> citation record
pub type CitationMap = BTreeMap<String, CitationRecord>;

/// Number of records per status `(verified, unverified, missing)`
pub fn status_counts(map: &CitationMap) -> (usize, usize, usize) {
    map.values()
        .fold((0, 0, 0), |(v, u, m), record| match record.status {
            Status::Verified => (v + 1, u, m),
            Status::Unverified => (v, u + 1, m),
            Status::Missing => (v, u, m + 1),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_precedence_order() {
        assert!(Status::Verified < Status::Unverified);
        assert!(Status::Unverified < Status::Missing);
    }

    #[test]
    fn test_record_serialization() {
        let json = serde_json::to_string(&CitationRecord::verified(3)).unwrap();
        assert_eq!(json, r#"{"page":3,"status":"verified"}"#);

        let json = serde_json::to_string(&CitationRecord::missing()).unwrap();
        assert_eq!(json, r#"{"page":null,"status":"missing"}"#);
    }

    #[test]
    fn test_status_counts() {
        let mut map = CitationMap::new();
        map.insert("a".into(), CitationRecord::verified(1));
        map.insert("b".into(), CitationRecord::unverified(2));
        map.insert("c".into(), CitationRecord::missing());
        map.insert("d".into(), CitationRecord::verified(5));
        assert_eq!(status_counts(&map), (2, 1, 1));
    }
}
