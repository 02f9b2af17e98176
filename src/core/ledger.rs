//! Append-only ledger of verification runs.
//!
//! Each `citemark verify` run appends one JSON line recording what was
//! checked and how it resolved. Appends take an exclusive file lock so
//! concurrent runs never interleave lines.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::domain::{status_counts, CitationMap};

/// One recorded verification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub ts: DateTime<Utc>,
    pub run_id: Uuid,

    /// Source document as given on the command line
    pub document: PathBuf,

    /// Content digest of the source document
    pub document_hash: String,

    /// Annotated output, absent when writing it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    pub pages: usize,
    pub verified: usize,
    pub unverified: usize,
    pub missing: usize,
}

impl LedgerEntry {
    /// Summarize a run's citations
    pub fn new(
        run_id: Uuid,
        document: &Path,
        document_bytes: &[u8],
        pages: usize,
        citations: &CitationMap,
        output: Option<PathBuf>,
    ) -> Self {
        let (verified, unverified, missing) = status_counts(citations);
        Self {
            ts: Utc::now(),
            run_id,
            document: document.to_path_buf(),
            document_hash: compute_hash(document_bytes),
            output,
            pages,
            verified,
            unverified,
            missing,
        }
    }
}

/// JSONL ledger file
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Ledger stored as `ledger.jsonl` under `dir`, creating the directory
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create ledger directory: {}", dir.display()))?;
        Ok(Self {
            path: dir.join("ledger.jsonl"),
        })
    }

    /// Append an entry with file locking
    pub fn append(&self, entry: &LedgerEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger: {}", self.path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire file lock on ledger")?;

        let json = serde_json::to_string(entry).context("Failed to serialize ledger entry")?;
        writeln!(file, "{}", json).context("Failed to write ledger entry")?;
        file.flush().context("Failed to flush ledger entry")?;

        // Lock is released when file is dropped
        Ok(())
    }

    /// Read all entries in append order
    pub async fn replay(&self) -> Result<Vec<LedgerEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open ledger: {}", self.path.display()))?;

        let mut lines = BufReader::new(file).lines();
        let mut entries = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let entry: LedgerEntry = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse ledger entry: {}", line))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Most recent entries, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        let mut entries = self.replay().await?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}

/// SHA256 digest formatted as `sha256:<hex>`
pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CitationRecord;
    use tempfile::TempDir;

    fn sample_citations() -> CitationMap {
        let mut citations = CitationMap::new();
        citations.insert("A".to_string(), CitationRecord::verified(1));
        citations.insert("B".to_string(), CitationRecord::unverified(2));
        citations.insert("C".to_string(), CitationRecord::missing());
        citations.insert("D".to_string(), CitationRecord::verified(4));
        citations
    }

    #[test]
    fn test_entry_counts_and_hash() {
        let entry = LedgerEntry::new(
            Uuid::new_v4(),
            Path::new("contract.pdf"),
            b"%PDF-1.5",
            5,
            &sample_citations(),
            None,
        );

        assert_eq!((entry.verified, entry.unverified, entry.missing), (2, 1, 1));
        assert!(entry.document_hash.starts_with("sha256:"));
        assert_eq!(entry.document_hash.len(), 7 + 64);
    }

    #[test]
    fn test_hash_consistency() {
        assert_eq!(compute_hash(b"abc"), compute_hash(b"abc"));
        assert_ne!(compute_hash(b"abc"), compute_hash(b"abd"));
    }

    #[tokio::test]
    async fn test_append_and_replay() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(&dir.path().join("state")).unwrap();
        assert!(ledger.replay().await.unwrap().is_empty());

        let citations = sample_citations();
        let first = LedgerEntry::new(Uuid::new_v4(), Path::new("a.pdf"), b"a", 1, &citations, None);
        let second = LedgerEntry::new(
            Uuid::new_v4(),
            Path::new("b.pdf"),
            b"b",
            2,
            &citations,
            Some(PathBuf::from("out/b.highlighted.pdf")),
        );
        ledger.append(&first).unwrap();
        ledger.append(&second).unwrap();

        let entries = ledger.replay().await.unwrap();
        assert_eq!(entries, vec![first.clone(), second.clone()]);

        let recent = ledger.recent(1).await.unwrap();
        assert_eq!(recent, vec![second]);
    }
}
