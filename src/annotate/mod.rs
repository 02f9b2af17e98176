//! Highlight annotation writer.
//!
//! The output is a copy of the input document with one `/Highlight`
//! annotation per match instance. Pages are never added, dropped or
//! reordered. Output is produced whole: either rendered into memory or
//! written to a temporary file beside the destination and renamed into place.

use std::io::Write;
use std::path::Path;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::domain::{quads_bounds, MatchInstance, MatchTable};
use crate::evidence::QuoteIndex;

/// Errors raised while producing the annotated document
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Match on page {0} has no such page in the document")]
    MissingPage(usize),
}

/// Add highlight annotations for every match to `doc`.
///
/// Returns the number of annotations written.
pub fn annotate(
    doc: &mut Document,
    matches: &MatchTable,
    quotes: &QuoteIndex,
) -> Result<usize, AnnotateError> {
    let pages = doc.get_pages();
    let mut written = 0;

    for (page, instances) in matches.by_page() {
        let page_id = *pages
            .get(&(page as u32 + 1))
            .ok_or(AnnotateError::MissingPage(page))?;

        for instance in instances {
            let Some(annotation) = highlight(instance, quotes.labels(&instance.key), page_id) else {
                continue;
            };
            let annot_id = doc.add_object(annotation);
            attach(doc, page_id, annot_id)?;
            written += 1;
        }
        debug!(page = page + 1, "Annotated page");
    }

    Ok(written)
}

/// Render an annotated copy of `doc` into memory
#[instrument(skip_all)]
pub fn render(
    doc: &Document,
    matches: &MatchTable,
    quotes: &QuoteIndex,
) -> Result<Vec<u8>, AnnotateError> {
    let mut copy = doc.clone();
    let written = annotate(&mut copy, matches, quotes)?;

    let mut buffer = Vec::new();
    copy.save_to(&mut buffer)?;

    info!(annotations = written, bytes = buffer.len(), "Rendered annotated document");
    Ok(buffer)
}

/// Write an annotated copy of `doc` to `path` atomically
#[instrument(skip(doc, matches, quotes))]
pub fn write_atomic(
    doc: &Document,
    matches: &MatchTable,
    quotes: &QuoteIndex,
    path: &Path,
) -> Result<(), AnnotateError> {
    let bytes = render(doc, matches, quotes)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), "Wrote annotated document");
    Ok(())
}

/// Build the `/Highlight` annotation dictionary for one instance
fn highlight(instance: &MatchInstance, labels: &[String], page_id: ObjectId) -> Option<Dictionary> {
    let rect = quads_bounds(&instance.quads)?;
    let quad_points: Vec<Object> = instance
        .quads
        .iter()
        .flatten()
        .map(|&v| Object::Real(v))
        .collect();

    Some(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Highlight",
        "Rect" => rect.to_array().iter().map(|&v| Object::Real(v)).collect::<Vec<_>>(),
        "QuadPoints" => quad_points,
        "C" => vec![Object::Real(1.0), Object::Real(1.0), Object::Real(0.0)],
        "F" => 4,
        "P" => page_id,
        "Contents" => text_string(&labels.join(", ")),
    })
}

/// Append an annotation reference to a page's `/Annots`
fn attach(doc: &mut Document, page_id: ObjectId, annot_id: ObjectId) -> Result<(), AnnotateError> {
    let existing = doc
        .get_object(page_id)?
        .as_dict()?
        .get(b"Annots")
        .ok()
        .cloned();

    let annots = match existing {
        Some(Object::Reference(id)) => {
            if let Ok(Object::Array(items)) = doc.get_object_mut(id) {
                items.push(Object::Reference(annot_id));
                return Ok(());
            }
            vec![Object::Reference(annot_id)]
        }
        Some(Object::Array(mut items)) => {
            items.push(Object::Reference(annot_id));
            items
        }
        _ => vec![Object::Reference(annot_id)],
    };

    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Annots", Object::Array(annots));
    Ok(())
}

/// Encode text as a PDF text string: literal when ASCII, UTF-16BE otherwise
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EvidenceItem;
    use crate::layout::fonts::number;

    fn blank_document(pages: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => pages as i64,
                "Kids" => kids,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn table(page: usize, key: &str, quads: Vec<[f32; 8]>) -> MatchTable {
        vec![MatchInstance {
            page,
            key: key.to_string(),
            quads,
        }]
        .into_iter()
        .collect()
    }

    fn annots(doc: &Document, page: u32) -> Vec<Object> {
        let page_id = doc.get_pages()[&page];
        let dict = doc.get_dictionary(page_id).unwrap();
        match dict.get(b"Annots") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => doc.get_object(*id).unwrap().as_array().unwrap().clone(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_highlight_dictionary() {
        let quads = vec![
            [400.0, 710.0, 412.0, 710.0, 400.0, 700.0, 412.0, 700.0],
            [72.0, 696.0, 84.0, 696.0, 72.0, 686.0, 84.0, 686.0],
        ];
        let instance = MatchInstance {
            page: 0,
            key: "k".to_string(),
            quads,
        };
        let dict = highlight(&instance, &["Finance Date".to_string()], (1, 0)).unwrap();

        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Highlight");
        assert_eq!(dict.get(b"F").unwrap().as_i64().unwrap(), 4);

        let numbers = |key: &[u8]| -> Vec<f32> {
            dict.get(key)
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|o| number(o).unwrap())
                .collect()
        };

        // Quads flattened in order, each as x0,y1,x1,y1,x0,y0,x1,y0
        assert_eq!(
            numbers(b"QuadPoints"),
            vec![
                400.0, 710.0, 412.0, 710.0, 400.0, 700.0, 412.0, 700.0,
                72.0, 696.0, 84.0, 696.0, 72.0, 686.0, 84.0, 686.0,
            ]
        );
        assert_eq!(numbers(b"C"), vec![1.0, 1.0, 0.0]);
        assert_eq!(numbers(b"Rect"), vec![72.0, 686.0, 412.0, 710.0]);
    }

    #[test]
    fn test_empty_instance_skipped() {
        let instance = MatchInstance {
            page: 0,
            key: "k".to_string(),
            quads: vec![],
        };
        assert!(highlight(&instance, &[], (1, 0)).is_none());
    }

    #[test]
    fn test_annotate_appends_to_existing_annots() {
        let mut doc = blank_document(2);
        let page_id = doc.get_pages()[&2];
        let existing = doc.add_object(dictionary! { "Type" => "Annot", "Subtype" => "Text" });
        let array_id = doc.add_object(Object::Array(vec![existing.into()]));
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Annots", array_id);

        let evidence = vec![EvidenceItem::new("Clause", Some("k"), None)];
        let quotes = QuoteIndex::build(&evidence);
        let written = annotate(&mut doc, &table(1, "k", vec![[0.0, 10.0, 5.0, 10.0, 0.0, 0.0, 5.0, 0.0]]), &quotes).unwrap();

        assert_eq!(written, 1);
        assert_eq!(annots(&doc, 2).len(), 2);
        assert!(annots(&doc, 1).is_empty());
    }

    #[test]
    fn test_match_on_unknown_page_fails() {
        let mut doc = blank_document(1);
        let result = annotate(&mut doc, &table(5, "k", vec![[0.0; 8]]), &QuoteIndex::default());
        assert!(matches!(result, Err(AnnotateError::MissingPage(5))));
    }

    #[test]
    fn test_render_preserves_page_count() {
        let doc = blank_document(3);
        let bytes = render(&doc, &MatchTable::new(), &QuoteIndex::default()).unwrap();
        let reloaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 3);
    }

    #[test]
    fn test_write_atomic_replaces_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out").join("doc.highlighted.pdf");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"stale").unwrap();

        let doc = blank_document(1);
        write_atomic(&doc, &MatchTable::new(), &QuoteIndex::default(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        // No stray temp files left beside the output
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_text_string_encoding() {
        assert!(matches!(
            text_string("Date"),
            Object::String(ref bytes, StringFormat::Literal) if bytes == b"Date"
        ));
        match text_string("Café") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
                assert_eq!(bytes.len(), 2 + 4 * 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
