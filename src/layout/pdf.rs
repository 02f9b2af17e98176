//! PDF text layer backed by `lopdf`.
//!
//! Page content streams are interpreted just far enough to place every shown
//! glyph: graphics state (`q`/`Q`/`cm`), text state (`Tf`, `Tc`, `Tw`, `Tz`,
//! `TL`, `Ts`), positioning (`Td`, `TD`, `Tm`, `T*`) and the text-showing
//! operators (`Tj`, `TJ`, `'`, `"`). Glyphs are then grouped into lines, with
//! markers inserted for word gaps and line ends.
//!
//! Form XObjects invoked with `Do` are interpreted in place, under their own
//! `/Matrix` and `/Resources`. A form already on the invocation stack is not
//! entered again.

use std::collections::HashMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument, warn};

use crate::domain::BBox;

use super::fonts::{lookup, number, resolve, FontMetrics};
use super::{LayoutError, LayoutNode, TextLayer};

/// Tuning for turning placed glyphs into lines and words
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Horizontal gap, as a fraction of font size, that counts as a word break
    pub word_margin: f32,
    /// Baseline shift, as a fraction of font size, that starts a new line
    pub line_break_ratio: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            word_margin: 0.1,
            line_break_ratio: 0.5,
        }
    }
}

/// A loaded PDF exposing its pages' text layout
#[derive(Debug, Clone)]
pub struct PdfDocument {
    doc: Document,
    pages: Vec<ObjectId>,
    options: LayoutOptions,
}

impl PdfDocument {
    /// Load a PDF from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        Ok(Self::from_document(Document::load(path)?))
    }

    /// Load a PDF from memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LayoutError> {
        Ok(Self::from_document(Document::load_mem(bytes)?))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self {
            doc,
            pages,
            options: LayoutOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self
    }

    /// Underlying document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Every glyph shown on a page, in content-stream order
    #[instrument(skip(self))]
    pub fn page_glyphs(&self, page: usize) -> Result<Vec<PlacedGlyph>, LayoutError> {
        let page_id = *self
            .pages
            .get(page)
            .ok_or(LayoutError::PageOutOfRange(page))?;

        let data = self.doc.get_page_content(page_id)?;
        let content = Content::decode(&data)?;
        let resources = page_resources(&self.doc, page_id);

        let mut interpreter = Interpreter::new(resource_fonts(&self.doc, resources));
        let mut frames = vec![Frame {
            operations: content.operations.into_iter(),
            resources,
            form: None,
            outer: None,
        }];

        while let Some(frame) = frames.last_mut() {
            let Some(op) = frame.operations.next() else {
                if let Some(outer) = frames.pop().and_then(|f| f.outer) {
                    interpreter.leave_form(outer);
                }
                continue;
            };

            if op.operator != "Do" {
                interpreter.apply(&op.operator, &op.operands)?;
                continue;
            }

            let resources = frame.resources;
            let Some((form_id, form)) = op
                .operands
                .first()
                .and_then(|o| o.as_name().ok())
                .and_then(|name| form_xobject(&self.doc, resources, name))
            else {
                continue;
            };

            if frames.len() > MAX_FORM_DEPTH || frames.iter().any(|f| f.form == Some(form_id)) {
                warn!(form = ?form_id, "Skipping recursive form XObject");
                continue;
            }

            let data = form
                .decompressed_content()
                .unwrap_or_else(|_| form.content.clone());
            let content = Content::decode(&data)?;
            let form_resources = lookup(&self.doc, &form.dict, b"Resources")
                .and_then(|o| o.as_dict().ok())
                .or(resources);
            let matrix = lookup(&self.doc, &form.dict, b"Matrix")
                .and_then(|o| o.as_array().ok())
                .map(|items| matrix_operand("Do", items))
                .transpose()?
                .unwrap_or(IDENTITY);

            let outer = interpreter.enter_form(&matrix, resource_fonts(&self.doc, form_resources));
            frames.push(Frame {
                operations: content.operations.into_iter(),
                resources: form_resources,
                form: Some(form_id),
                outer: Some(outer),
            });
        }

        debug!(glyphs = interpreter.glyphs.len(), "Interpreted page content");
        Ok(interpreter.glyphs)
    }
}

impl TextLayer for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_layout(&self, page: usize) -> Result<LayoutNode, LayoutError> {
        let glyphs = self.page_glyphs(page)?;
        Ok(build_layout(glyphs, &self.options))
    }
}

/// One glyph placed on the page
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    pub bbox: BBox,
    /// Baseline origin in user space
    pub origin: (f32, f32),
    /// Effective font size in user space
    pub size: f32,
}

/// Nesting limit for form XObjects
const MAX_FORM_DEPTH: usize = 16;

type FontMap = HashMap<Vec<u8>, FontMetrics>;

/// One content stream being interpreted
struct Frame<'a> {
    operations: std::vec::IntoIter<Operation>,
    resources: Option<&'a Dictionary>,
    /// Form XObject this stream belongs to; `None` for the page itself
    form: Option<ObjectId>,
    /// State to restore once the form's stream is exhausted
    outer: Option<OuterContext>,
}

/// A page's `/Resources`, following inheritance through `/Parent`
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok();

    for _ in 0..32 {
        let dict = node?;
        if let Some(resources) = lookup(doc, dict, b"Resources").and_then(|o| o.as_dict().ok()) {
            return Some(resources);
        }
        node = lookup(doc, dict, b"Parent").and_then(|o| o.as_dict().ok());
    }

    None
}

/// Fonts named in a resource dictionary
fn resource_fonts(doc: &Document, resources: Option<&Dictionary>) -> FontMap {
    let mut fonts = HashMap::new();
    let Some(font_dict) = resources
        .and_then(|r| lookup(doc, r, b"Font"))
        .and_then(|o| o.as_dict().ok())
    else {
        return fonts;
    };

    for (name, obj) in font_dict.iter() {
        if let Some(font) = resolve(doc, obj).and_then(|o| o.as_dict().ok()) {
            fonts.insert(name.clone(), FontMetrics::load(doc, font));
        }
    }
    fonts
}

/// The form XObject a `Do` operand names, with its object id
fn form_xobject<'a>(
    doc: &'a Document,
    resources: Option<&'a Dictionary>,
    name: &[u8],
) -> Option<(ObjectId, &'a lopdf::Stream)> {
    let xobjects = lookup(doc, resources?, b"XObject")?.as_dict().ok()?;
    let id = xobjects.get(name).ok()?.as_reference().ok()?;
    let stream = doc.get_object(id).ok()?.as_stream().ok()?;

    let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
    (subtype == b"Form").then_some((id, stream))
}

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m1 × m2`: apply `m1`, then `m2`
fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn transform(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Interpreter state saved around a form XObject
struct OuterContext {
    state: GraphicsState,
    saved_depth: usize,
    fonts: FontMap,
}

struct Interpreter {
    fonts: FontMap,
    fallback: FontMetrics,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    glyphs: Vec<PlacedGlyph>,
}

impl Interpreter {
    fn new(fonts: FontMap) -> Self {
        Self {
            fonts,
            fallback: FontMetrics::default(),
            state: GraphicsState {
                ctm: IDENTITY,
                text: TextState::default(),
            },
            saved: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            glyphs: Vec::new(),
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) -> Result<(), LayoutError> {
        match operator {
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                let m = matrix_operand(operator, operands)?;
                self.state.ctm = multiply(&m, &self.state.ctm);
            }
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    self.state.text.font = name.to_vec();
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    self.state.text.size = size;
                }
            }
            "Tc" => self.state.text.char_spacing = scalar(operator, operands, 0)?,
            "Tw" => self.state.text.word_spacing = scalar(operator, operands, 0)?,
            "Tz" => self.state.text.horizontal_scale = scalar(operator, operands, 0)? / 100.0,
            "TL" => self.state.text.leading = scalar(operator, operands, 0)?,
            "Ts" => self.state.text.rise = scalar(operator, operands, 0)?,
            "Td" => {
                let (tx, ty) = (scalar(operator, operands, 0)?, scalar(operator, operands, 1)?);
                self.move_line(tx, ty);
            }
            "TD" => {
                let (tx, ty) = (scalar(operator, operands, 0)?, scalar(operator, operands, 1)?);
                self.state.text.leading = -ty;
                self.move_line(tx, ty);
            }
            "Tm" => {
                let m = matrix_operand(operator, operands)?;
                self.text_matrix = m;
                self.line_matrix = m;
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(bytes) = string_operand(operands.first()) {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(bytes) = string_operand(operands.first()) {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.state.text.word_spacing = scalar(operator, operands, 0)?;
                self.state.text.char_spacing = scalar(operator, operands, 1)?;
                self.next_line();
                if let Some(bytes) = string_operand(operands.get(2)) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                let Some(items) = operands.first().and_then(|o| o.as_array().ok()) else {
                    return Err(malformed(operator));
                };
                for item in items {
                    if let Some(bytes) = string_operand(Some(item)) {
                        self.show(bytes);
                    } else if let Some(adjust) = number(item) {
                        let text = &self.state.text;
                        let tx = -adjust / 1000.0 * text.size * text.horizontal_scale;
                        self.text_matrix = multiply(&translation(tx, 0.0), &self.text_matrix);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Switch to a form's resources and coordinate space
    fn enter_form(&mut self, matrix: &Matrix, fonts: FontMap) -> OuterContext {
        let outer = OuterContext {
            state: self.state.clone(),
            saved_depth: self.saved.len(),
            fonts: std::mem::replace(&mut self.fonts, fonts),
        };
        self.state.ctm = multiply(matrix, &self.state.ctm);
        outer
    }

    fn leave_form(&mut self, outer: OuterContext) {
        self.saved.truncate(outer.saved_depth);
        self.state = outer.state;
        self.fonts = outer.fonts;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&translation(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, bytes: &[u8]) {
        let metrics = self
            .fonts
            .get(&self.state.text.font)
            .unwrap_or(&self.fallback);
        let text = &self.state.text;

        for code in metrics.codes(bytes) {
            let advance = metrics.width(code) / 1000.0;
            let render = multiply(
                &[
                    text.size * text.horizontal_scale,
                    0.0,
                    0.0,
                    text.size,
                    0.0,
                    text.rise,
                ],
                &multiply(&self.text_matrix, &self.state.ctm),
            );

            let corners = [
                (0.0, metrics.descent()),
                (advance, metrics.descent()),
                (0.0, metrics.ascent()),
                (advance, metrics.ascent()),
            ];
            let bbox = BBox::from_points(corners.iter().map(|&(x, y)| transform(&render, x, y)));
            let origin = transform(&render, 0.0, 0.0);
            let size = render[2].hypot(render[3]);

            let chars: Vec<char> = metrics
                .decode(code)
                .chars()
                .filter(|c| !c.is_control() || c.is_whitespace())
                .collect();
            if let (Some(bbox), false) = (bbox, chars.is_empty()) {
                // Split ligatures evenly across their chars
                let step = bbox.width() / chars.len() as f32;
                for (i, ch) in chars.iter().enumerate() {
                    let x0 = bbox.x0 + step * i as f32;
                    self.glyphs.push(PlacedGlyph {
                        ch: *ch,
                        bbox: BBox::new(x0, bbox.y0, x0 + step, bbox.y1),
                        origin,
                        size,
                    });
                }
            }

            let mut tx = advance * text.size + text.char_spacing;
            if metrics.is_word_space(code) {
                tx += text.word_spacing;
            }
            tx *= text.horizontal_scale;
            self.text_matrix = multiply(&translation(tx, 0.0), &self.text_matrix);
        }
    }
}

fn malformed(operator: &str) -> LayoutError {
    LayoutError::Malformed(format!("bad operands for '{}'", operator))
}

fn scalar(operator: &str, operands: &[Object], idx: usize) -> Result<f32, LayoutError> {
    operands
        .get(idx)
        .and_then(number)
        .ok_or_else(|| malformed(operator))
}

fn matrix_operand(operator: &str, operands: &[Object]) -> Result<Matrix, LayoutError> {
    let mut m = IDENTITY;
    for (i, slot) in m.iter_mut().enumerate() {
        *slot = scalar(operator, operands, i)?;
    }
    Ok(m)
}

fn string_operand(obj: Option<&Object>) -> Option<&[u8]> {
    match obj {
        Some(Object::String(bytes, _)) => Some(bytes.as_slice()),
        _ => None,
    }
}

/// Group placed glyphs into lines and words.
///
/// A glyph starts a new line when its baseline moves by more than
/// `line_break_ratio` of the font size, or when it jumps back left of the
/// previous glyph. Within a line, a gap wider than `word_margin` of the font
/// size between two non-space glyphs gets a `' '` marker. Each line ends with
/// a `'\n'` marker.
pub fn build_layout(glyphs: Vec<PlacedGlyph>, options: &LayoutOptions) -> LayoutNode {
    let mut lines: Vec<Vec<LayoutNode>> = Vec::new();
    let mut current: Vec<LayoutNode> = Vec::new();
    let mut prev: Option<PlacedGlyph> = None;

    for glyph in glyphs {
        if let Some(p) = &prev {
            let size = p.size.max(glyph.size).max(f32::EPSILON);
            let baseline_shift = (glyph.origin.1 - p.origin.1).abs();
            let jumped_back = glyph.bbox.x0 < p.bbox.x0 - size;

            if baseline_shift > options.line_break_ratio * size || jumped_back {
                current.push(LayoutNode::Marker('\n'));
                lines.push(std::mem::take(&mut current));
            } else {
                let gap = glyph.bbox.x0 - p.bbox.x1;
                let spaced = p.ch.is_whitespace() || glyph.ch.is_whitespace();
                if !spaced && gap > options.word_margin * size {
                    current.push(LayoutNode::Marker(' '));
                }
            }
        }

        current.push(LayoutNode::glyph(glyph.ch, glyph.bbox));
        prev = Some(glyph);
    }

    if !current.is_empty() {
        current.push(LayoutNode::Marker('\n'));
        lines.push(current);
    }

    LayoutNode::Container(lines.into_iter().map(LayoutNode::Container).collect())
}
