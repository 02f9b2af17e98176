//! Evidence localization engine.
//!
//! One call takes a document and an evidence list through the whole flow:
//!
//! 1. Normalize quotes into distinct search keys
//! 2. Index each page's text layer and locate every key on it
//! 3. Group each occurrence's glyph boxes into per-line quads
//! 4. Resolve one citation record per label from the collected matches
//! 5. Write the annotated document
//!
//! Matching is collect-then-reduce: every page is searched, and only then is
//! the lowest verified page per label chosen. A page whose text layer cannot
//! be read is skipped with a warning.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::annotate::{self, AnnotateError};
use crate::domain::{status_counts, CitationMap, EvidenceItem, MatchInstance, MatchTable};
use crate::evidence::QuoteIndex;
use crate::layout::{LayoutError, LayoutOptions, PageTextIndex, PdfDocument, TextLayer};

use super::grouper::{group_lines, DEFAULT_LINE_TOLERANCE};
use super::locator::locate;
use super::resolver::resolve;

/// Errors that stop a verification run outright
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to open document: {0}")]
    Open(#[source] LayoutError),
}

/// Tunables for one engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Vertical tolerance for grouping glyph boxes into lines
    pub line_tolerance: f32,

    /// Word and line detection for PDF text layers
    pub layout: LayoutOptions,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            line_tolerance: DEFAULT_LINE_TOLERANCE,
            layout: LayoutOptions::default(),
        }
    }
}

/// Located matches and resolved citations for one document
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub citations: CitationMap,
    pub matches: MatchTable,
    pub quotes: QuoteIndex,
    pub page_count: usize,
}

/// Outcome of a full run: citations always, the annotated output if writing it succeeded
#[derive(Debug)]
pub struct Verification<T> {
    pub citations: CitationMap,
    pub matches: MatchTable,
    pub page_count: usize,
    pub annotated: Result<T, AnnotateError>,
}

/// The verification engine
#[derive(Debug, Clone, Default)]
pub struct Engine {
    settings: EngineSettings,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Load a PDF from disk with this engine's layout options
    pub fn open(&self, path: &Path) -> Result<PdfDocument, EngineError> {
        PdfDocument::open(path)
            .map(|pdf| pdf.with_options(self.settings.layout))
            .map_err(EngineError::Open)
    }

    /// Load a PDF from memory with this engine's layout options
    pub fn open_bytes(&self, bytes: &[u8]) -> Result<PdfDocument, EngineError> {
        PdfDocument::from_bytes(bytes)
            .map(|pdf| pdf.with_options(self.settings.layout))
            .map_err(EngineError::Open)
    }

    /// Find every occurrence of every key on every page
    #[instrument(skip_all, fields(pages = layer.page_count(), keys = quotes.len()))]
    pub fn locate<L: TextLayer + ?Sized>(&self, layer: &L, quotes: &QuoteIndex) -> MatchTable {
        let keys: Vec<(&str, Vec<char>)> = quotes.keys().map(|k| (k, k.chars().collect())).collect();
        let mut table = MatchTable::new();

        for page in 0..layer.page_count() {
            let layout = match layer.page_layout(page) {
                Ok(layout) => layout,
                Err(e) => {
                    warn!(page = page + 1, error = %e, "Skipping page with unreadable text layer");
                    continue;
                }
            };

            let index = PageTextIndex::build(&layout);
            if index.is_empty() {
                continue;
            }

            for (key, chars) in &keys {
                let occurrences = locate(&index, chars);
                if occurrences.is_empty() {
                    continue;
                }
                debug!(page = page + 1, key = %key, count = occurrences.len(), "Located quote");

                for occurrence in occurrences {
                    table.push(MatchInstance {
                        page,
                        key: key.to_string(),
                        quads: group_lines(&occurrence.boxes, self.settings.line_tolerance),
                    });
                }
            }
        }

        table
    }

    /// Locate and resolve without producing output
    pub fn analyze<L: TextLayer + ?Sized>(&self, layer: &L, evidence: &[EvidenceItem]) -> Analysis {
        let quotes = QuoteIndex::build(evidence);
        let matches = self.locate(layer, &quotes);
        let citations = resolve(&matches, &quotes, evidence);

        let (verified, unverified, missing) = status_counts(&citations);
        info!(
            labels = citations.len(),
            matches = matches.len(),
            verified,
            unverified,
            missing,
            "Resolved citations"
        );

        Analysis {
            citations,
            matches,
            quotes,
            page_count: layer.page_count(),
        }
    }

    /// Verify evidence against an open PDF and render the annotated copy into memory
    pub fn verify_document(&self, pdf: &PdfDocument, evidence: &[EvidenceItem]) -> Verification<Vec<u8>> {
        let analysis = self.analyze(pdf, evidence);
        let annotated = annotate::render(pdf.document(), &analysis.matches, &analysis.quotes);
        analysis.into_verification(annotated)
    }

    /// Verify evidence against a PDF given as bytes
    pub fn verify_bytes(
        &self,
        bytes: &[u8],
        evidence: &[EvidenceItem],
    ) -> Result<Verification<Vec<u8>>, EngineError> {
        let pdf = self.open_bytes(bytes)?;
        Ok(self.verify_document(&pdf, evidence))
    }

    /// Verify evidence against a PDF on disk and write the annotated copy to `output`
    #[instrument(skip(self, evidence), fields(labels = evidence.len()))]
    pub fn verify_file(
        &self,
        input: &Path,
        evidence: &[EvidenceItem],
        output: &Path,
    ) -> Result<Verification<PathBuf>, EngineError> {
        let pdf = self.open(input)?;
        Ok(self.verify_to_path(&pdf, evidence, output))
    }

    /// Verify evidence against an open PDF and write the annotated copy to `output`
    pub fn verify_to_path(
        &self,
        pdf: &PdfDocument,
        evidence: &[EvidenceItem],
        output: &Path,
    ) -> Verification<PathBuf> {
        let analysis = self.analyze(pdf, evidence);

        let annotated = annotate::write_atomic(pdf.document(), &analysis.matches, &analysis.quotes, output)
            .map(|()| output.to_path_buf());
        if let Err(e) = &annotated {
            warn!(error = %e, "Failed to write annotated document");
        }

        analysis.into_verification(annotated)
    }
}

impl Analysis {
    fn into_verification<T>(self, annotated: Result<T, AnnotateError>) -> Verification<T> {
        Verification {
            citations: self.citations,
            matches: self.matches,
            page_count: self.page_count,
            annotated,
        }
    }
}
