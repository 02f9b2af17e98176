//! Shared fixtures: in-memory layouts and synthesized PDFs.

#![allow(dead_code)]

use citemark::domain::BBox;
use citemark::LayoutNode;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Glyph width and line pitch used by the in-memory layouts
pub const ADVANCE: f32 = 6.0;
pub const LINE_PITCH: f32 = 14.0;

/// One line of glyphs starting at `(x, y)`, ending in a line-break marker
pub fn text_line(text: &str, x: f32, y: f32) -> LayoutNode {
    let mut nodes: Vec<LayoutNode> = Vec::new();
    for (i, ch) in text.chars().enumerate() {
        let x0 = x + i as f32 * ADVANCE;
        if ch == ' ' {
            nodes.push(LayoutNode::Marker(' '));
        } else {
            nodes.push(LayoutNode::glyph(ch, BBox::new(x0, y, x0 + ADVANCE, y + 10.0)));
        }
    }
    nodes.push(LayoutNode::Marker('\n'));
    LayoutNode::Container(nodes)
}

/// A page of lines stacked downward from y = 700
pub fn page(lines: &[&str]) -> LayoutNode {
    LayoutNode::Container(
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| text_line(line, 72.0, 700.0 - i as f32 * LINE_PITCH))
            .collect(),
    )
}

/// A document of filler pages with `lines` placed on page `at` (0-based)
pub fn document_with(total: usize, at: usize, lines: &[&str]) -> Vec<LayoutNode> {
    (0..total)
        .map(|i| {
            if i == at {
                page(lines)
            } else {
                page(&["Intentionally left blank."])
            }
        })
        .collect()
}

/// Build a PDF whose pages show the given lines in 10pt Courier.
///
/// Lines are placed from the top of a Letter page at a 14pt pitch.
pub fn build_pdf(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

/// Finish a one-page document that shows `operations` with `resources`.
///
/// Fonts, forms and other objects the resources point at are added to `doc`
/// by the caller beforehand.
pub fn single_page(mut doc: Document, resources: lopdf::Dictionary, operations: Vec<Operation>) -> Vec<u8> {
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        Content { operations }.encode().expect("encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

/// `BT /F1 10 Tf x y Td (text) Tj ET`
pub fn show_text(x: i64, y: i64, text: &[u8]) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 10.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text.to_vec())]),
        Operation::new("ET", vec![]),
    ]
}

/// `/Highlight` annotation dictionaries per page, pages in order
pub fn highlights(bytes: &[u8]) -> Vec<Vec<lopdf::Dictionary>> {
    let doc = Document::load_mem(bytes).expect("load annotated pdf");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).expect("page dictionary");
            let annots = match page.get(b"Annots") {
                Ok(Object::Array(items)) => items.clone(),
                Ok(Object::Reference(id)) => doc
                    .get_object(*id)
                    .and_then(Object::as_array)
                    .cloned()
                    .unwrap_or_default(),
                _ => Vec::new(),
            };
            annots
                .iter()
                .filter_map(|a| a.as_reference().ok())
                .filter_map(|id| doc.get_dictionary(id).ok())
                .filter(|d| {
                    d.get(b"Subtype")
                        .and_then(Object::as_name)
                        .map_or(false, |n| n == b"Highlight")
                })
                .cloned()
                .collect()
        })
        .collect()
}

/// Numeric entries of an array-valued annotation key
pub fn numbers(dict: &lopdf::Dictionary, key: &[u8]) -> Vec<f32> {
    dict.get(key)
        .and_then(Object::as_array)
        .expect("array entry")
        .iter()
        .map(|o| match o {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r as f32,
            other => panic!("not a number: {:?}", other),
        })
        .collect()
}
