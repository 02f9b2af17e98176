//! Font metrics and character decoding for text extraction.
//!
//! Only what glyph placement needs: advance widths, vertical extent, the
//! number of bytes per character code, and the code -> Unicode mapping
//! (ToUnicode CMap when present, the font's single-byte encoding otherwise).

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use super::encoding::SimpleEncoding;

/// Upper bound on codes expanded from one `bfrange` entry
const MAX_RANGE_SPAN: u32 = 0xFFFF;

/// Follow indirect references to the underlying object
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..8 {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Resolve `dict[key]`
pub(crate) fn lookup<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

/// Numeric value of an integer or real object
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Metrics of one font resource
#[derive(Debug, Clone)]
pub struct FontMetrics {
    /// Type0 fonts use two-byte codes
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
    ascent: f32,
    descent: f32,
    encoding: SimpleEncoding,
    to_unicode: Option<HashMap<u32, String>>,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: 500.0,
            ascent: 0.8,
            descent: -0.2,
            encoding: SimpleEncoding::default(),
            to_unicode: None,
        }
    }
}

impl FontMetrics {
    /// Read metrics from a font dictionary
    pub fn load(doc: &Document, font: &Dictionary) -> Self {
        let mut metrics = FontMetrics::default();

        let subtype = lookup(doc, font, b"Subtype")
            .and_then(|o| o.as_name().ok())
            .unwrap_or_default();

        if let Some(base) = lookup(doc, font, b"BaseFont").and_then(|o| o.as_name().ok()) {
            if base.windows(7).any(|w| w == b"Courier") {
                metrics.default_width = 600.0;
            }
        }

        let descriptor_owner = if subtype == b"Type0" {
            metrics.two_byte = true;
            metrics.default_width = 1000.0;
            let descendant = lookup(doc, font, b"DescendantFonts")
                .and_then(|o| o.as_array().ok())
                .and_then(|arr| arr.first())
                .and_then(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok());
            if let Some(cid_font) = descendant {
                metrics.load_cid_widths(doc, cid_font);
            }
            descendant
        } else {
            metrics.load_simple_widths(doc, font);
            if let Some(encoding) = lookup(doc, font, b"Encoding") {
                metrics.encoding = SimpleEncoding::load(doc, encoding);
            }
            Some(font)
        };

        if let Some(descriptor) = descriptor_owner
            .and_then(|d| lookup(doc, d, b"FontDescriptor"))
            .and_then(|o| o.as_dict().ok())
        {
            metrics.load_descriptor(doc, descriptor);
        }

        if let Some(stream) = lookup(doc, font, b"ToUnicode").and_then(|o| o.as_stream().ok()) {
            let data = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            let map = parse_to_unicode(&data);
            debug!(entries = map.len(), "Loaded ToUnicode map");
            metrics.to_unicode = Some(map);
        }

        metrics
    }

    fn load_simple_widths(&mut self, doc: &Document, font: &Dictionary) {
        self.first_char = lookup(doc, font, b"FirstChar")
            .and_then(number)
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);
        if let Some(widths) = lookup(doc, font, b"Widths").and_then(|o| o.as_array().ok()) {
            self.widths = widths
                .iter()
                .map(|w| resolve(doc, w).and_then(number).unwrap_or(0.0))
                .collect();
        }
    }

    fn load_cid_widths(&mut self, doc: &Document, cid_font: &Dictionary) {
        if let Some(dw) = lookup(doc, cid_font, b"DW").and_then(number) {
            self.default_width = dw;
        }
        let Some(w) = lookup(doc, cid_font, b"W").and_then(|o| o.as_array().ok()) else {
            return;
        };

        // Entries are either `c [w1 w2 ...]` or `c_first c_last w`
        let mut i = 0;
        while i < w.len() {
            let Some(first) = resolve(doc, &w[i]).and_then(number) else {
                break;
            };
            let first = first as u32;
            match w.get(i + 1).and_then(|o| resolve(doc, o)) {
                Some(Object::Array(list)) => {
                    for (cid, width) in (first..=u32::MAX).zip(list) {
                        if let Some(width) = number(width) {
                            self.cid_widths.insert(cid, width);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let (Some(last), Some(width)) = (
                        number(last),
                        w.get(i + 2).and_then(|o| resolve(doc, o)).and_then(number),
                    ) else {
                        break;
                    };
                    let last = (last as u32).min(first.saturating_add(MAX_RANGE_SPAN));
                    for cid in first..=last {
                        self.cid_widths.insert(cid, width);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    fn load_descriptor(&mut self, doc: &Document, descriptor: &Dictionary) {
        if let Some(missing) = lookup(doc, descriptor, b"MissingWidth").and_then(number) {
            if !self.two_byte && missing > 0.0 {
                self.default_width = missing;
            }
        }
        let ascent = lookup(doc, descriptor, b"Ascent").and_then(number);
        let descent = lookup(doc, descriptor, b"Descent").and_then(number);
        if let (Some(ascent), Some(descent)) = (ascent, descent) {
            if ascent > descent && ascent > 0.0 {
                self.ascent = ascent / 1000.0;
                self.descent = descent.min(0.0) / 1000.0;
            }
        }
    }

    /// Split a shown string into character codes
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [b] => u32::from(*b),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }

    /// Advance width of a code in thousandths of text space
    pub fn width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self.cid_widths.get(&code).copied().unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|idx| self.widths.get(idx as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }

    /// Unicode text for a code
    pub fn decode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.get(&code)) {
            return text.clone();
        }
        if self.two_byte {
            return char::from_u32(code)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string();
        }
        u8::try_from(code)
            .map_or(char::REPLACEMENT_CHARACTER, |b| self.encoding.decode(b))
            .to_string()
    }

    /// True when the code is the single-byte space that word spacing applies to
    pub fn is_word_space(&self, code: u32) -> bool {
        !self.two_byte && code == 32
    }

    /// Glyph top relative to the baseline, in em
    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    /// Glyph bottom relative to the baseline, in em (negative)
    pub fn descent(&self) -> f32 {
        self.descent
    }
}

#[derive(Debug, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

fn tokenize_cmap(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'<' if data.get(i + 1) == Some(&b'<') => {
                tokens.push(CMapToken::Word("<<".to_string()));
                i += 2;
            }
            b'>' if data.get(i + 1) == Some(&b'>') => {
                tokens.push(CMapToken::Word(">>".to_string()));
                i += 2;
            }
            b'<' => {
                let end = data[i + 1..]
                    .iter()
                    .position(|&b| b == b'>')
                    .map_or(data.len(), |p| i + 1 + p);
                let digits: Vec<u8> = data[i + 1..end]
                    .iter()
                    .copied()
                    .filter(u8::is_ascii_hexdigit)
                    .collect();
                tokens.push(CMapToken::Hex(hex_bytes(&digits)));
                i = end + 1;
            }
            b'[' => {
                tokens.push(CMapToken::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::ArrayEnd);
                i += 1;
            }
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'%')
                {
                    i += 1;
                }
                tokens.push(CMapToken::Word(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
        }
    }
    tokens
}

fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    let mut padded = digits.to_vec();
    if padded.len() % 2 == 1 {
        padded.push(b'0');
    }
    hex::decode(&padded).unwrap_or_default()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, &b| acc << 8 | u32::from(b))
}

fn utf16be(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&bytes_to_units(bytes))
}

/// Parse the `bfchar`/`bfrange` sections of a ToUnicode CMap
pub fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let tokens = tokenize_cmap(data);
    let mut map = HashMap::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Word(w) if w == "beginbfchar" => {
                i += 1;
                while i + 1 < tokens.len() {
                    match (&tokens[i], &tokens[i + 1]) {
                        (CMapToken::Hex(src), CMapToken::Hex(dst)) => {
                            map.insert(code_of(src), utf16be(dst));
                            i += 2;
                        }
                        _ => break,
                    }
                }
            }
            CMapToken::Word(w) if w == "beginbfrange" => {
                i += 1;
                while i + 2 < tokens.len() {
                    let (CMapToken::Hex(lo), CMapToken::Hex(hi)) = (&tokens[i], &tokens[i + 1]) else {
                        break;
                    };
                    let lo = code_of(lo);
                    let hi = code_of(hi).min(lo.saturating_add(MAX_RANGE_SPAN));
                    match &tokens[i + 2] {
                        CMapToken::Hex(dst) => {
                            let mut units = bytes_to_units(dst);
                            for code in lo..=hi {
                                map.insert(code, String::from_utf16_lossy(&units));
                                if let Some(last) = units.last_mut() {
                                    *last = last.wrapping_add(1);
                                }
                            }
                            i += 3;
                        }
                        CMapToken::ArrayStart => {
                            i += 3;
                            let mut code = Some(lo);
                            while let Some(CMapToken::Hex(dst)) = tokens.get(i) {
                                if let Some(c) = code.filter(|c| *c <= hi) {
                                    map.insert(c, utf16be(dst));
                                }
                                code = code.and_then(|c| c.checked_add(1));
                                i += 1;
                            }
                            if tokens.get(i) == Some(&CMapToken::ArrayEnd) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }

    map
}

fn bytes_to_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|c| match c {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [b] => u16::from(*b),
            _ => 0,
        })
        .collect()
}
