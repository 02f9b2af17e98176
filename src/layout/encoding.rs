//! Single-byte encodings for simple fonts.
//!
//! A simple font's `/Encoding` is either a base encoding name or a dictionary
//! holding a `/BaseEncoding` and a `/Differences` array of glyph names. Glyph
//! names are mapped to Unicode through the standard glyph list, the
//! `uniXXXX`/`uXXXX` forms, and the names of the Latin-1 and WinAnsi tables.

use std::collections::HashMap;

use lopdf::{Document, Object};

use super::fonts::{lookup, resolve};

/// Predefined encoding a font starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseEncoding {
    #[default]
    WinAnsi,
    MacRoman,
    Standard,
}

impl BaseEncoding {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"WinAnsiEncoding" => Some(Self::WinAnsi),
            b"MacRomanEncoding" => Some(Self::MacRoman),
            b"StandardEncoding" => Some(Self::Standard),
            _ => None,
        }
    }

    /// Character for a byte; `'\0'` where the encoding leaves it undefined
    pub fn decode(self, byte: u8) -> char {
        match self {
            Self::WinAnsi => win_ansi(byte),
            Self::MacRoman => mac_roman(byte),
            Self::Standard => standard(byte),
        }
    }
}

/// Encoding of a simple font: a base table plus per-code overrides
#[derive(Debug, Clone, Default)]
pub struct SimpleEncoding {
    base: BaseEncoding,
    differences: HashMap<u8, char>,
}

impl SimpleEncoding {
    /// Read an `/Encoding` entry, either a name or a dictionary
    pub fn load(doc: &Document, obj: &Object) -> Self {
        match resolve(doc, obj) {
            Some(Object::Name(name)) => Self {
                base: BaseEncoding::from_name(name).unwrap_or_default(),
                differences: HashMap::new(),
            },
            Some(Object::Dictionary(dict)) => {
                let base = lookup(doc, dict, b"BaseEncoding")
                    .and_then(|o| o.as_name().ok())
                    .and_then(BaseEncoding::from_name)
                    .unwrap_or_default();
                let differences = lookup(doc, dict, b"Differences")
                    .and_then(|o| o.as_array().ok())
                    .map(|items| parse_differences(doc, items))
                    .unwrap_or_default();
                Self { base, differences }
            }
            _ => Self::default(),
        }
    }

    pub fn decode(&self, byte: u8) -> char {
        self.differences
            .get(&byte)
            .copied()
            .unwrap_or_else(|| self.base.decode(byte))
    }
}

/// `[code name name ... code name ...]`: each name takes the next code
fn parse_differences(doc: &Document, items: &[Object]) -> HashMap<u8, char> {
    let mut map = HashMap::new();
    let mut code: Option<u8> = None;

    for item in items {
        match resolve(doc, item) {
            Some(Object::Integer(start)) => code = u8::try_from(*start).ok(),
            Some(Object::Name(name)) => {
                if let Some(c) = code {
                    if let Some(ch) = std::str::from_utf8(name).ok().and_then(glyph_unicode) {
                        map.insert(c, ch);
                    }
                }
                code = code.and_then(|c| c.checked_add(1));
            }
            _ => {}
        }
    }

    map
}

/// Unicode character for a glyph name
pub fn glyph_unicode(name: &str) -> Option<char> {
    // Variant suffixes such as `a.sc` or `one.oldstyle`
    let name = name.split('.').next().unwrap_or(name);
    if name.is_empty() {
        return None;
    }

    if let Some(hex) = name.strip_prefix("uni").filter(|h| h.len() == 4) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(hex) = name.strip_prefix('u').filter(|h| (4..=6).contains(&h.len())) {
        if let Some(ch) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
            return Some(ch);
        }
    }

    if let Some(idx) = ASCII_NAMES.iter().position(|n| *n == name) {
        return char::from_u32(0x20 + idx as u32);
    }
    if let Some(idx) = LATIN1_NAMES.iter().position(|n| *n == name) {
        return char::from_u32(0xA0 + idx as u32);
    }
    if let Some(&(code, _)) = WIN_ANSI_NAMES.iter().find(|(_, n)| *n == name) {
        return Some(win_ansi(code));
    }
    EXTRA_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, ch)| ch)
}

/// WinAnsiEncoding for a single byte; Latin-1 outside the 0x80..0xA0 block
pub fn win_ansi(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        other => char::from(other),
    }
}

const MAC_ROMAN_HIGH: &str = concat!(
    "ÄÅÇÉÑÖÜáàâäãåçéè",
    "êëíìîïñóòôöõúùûü",
    "†°¢£§•¶ß®©™´¨≠ÆØ",
    "∞±≤≥¥µ∂∑∏π∫ªºΩæø",
    "¿¡¬√ƒ≈∆«»…\u{A0}ÀÃÕŒœ",
    "–—“”‘’÷◊ÿŸ⁄¤‹›ﬁﬂ",
    "‡·‚„‰ÂÊÁËÈÍÎÏÌÓÔ",
    "\u{F8FF}ÒÚÛÙıˆ˜¯˘˙˚¸˝˛ˇ",
);

fn mac_roman(byte: u8) -> char {
    if byte < 0x80 {
        return char::from(byte);
    }
    MAC_ROMAN_HIGH
        .chars()
        .nth(usize::from(byte - 0x80))
        .unwrap_or('\0')
}

fn standard(byte: u8) -> char {
    match byte {
        0x27 => '\u{2019}',
        0x60 => '\u{2018}',
        0x20..=0x7E => char::from(byte),
        _ => STANDARD_HIGH
            .iter()
            .find(|(code, _)| *code == byte)
            .and_then(|(_, name)| glyph_unicode(name))
            .unwrap_or('\0'),
    }
}

/// Glyph names for 0x20..=0x7E
const ASCII_NAMES: [&str; 95] = [
    "space", "exclam", "quotedbl", "numbersign", "dollar", "percent", "ampersand",
    "quotesingle", "parenleft", "parenright", "asterisk", "plus", "comma", "hyphen",
    "period", "slash", "zero", "one", "two", "three", "four", "five", "six", "seven",
    "eight", "nine", "colon", "semicolon", "less", "equal", "greater", "question", "at",
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
    "R", "S", "T", "U", "V", "W", "X", "Y", "Z", "bracketleft", "backslash",
    "bracketright", "asciicircum", "underscore", "grave", "a", "b", "c", "d", "e", "f",
    "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w",
    "x", "y", "z", "braceleft", "bar", "braceright", "asciitilde",
];

/// Glyph names for 0xA0..=0xFF; empty where another table names the code
const LATIN1_NAMES: [&str; 96] = [
    "", "exclamdown", "cent", "sterling", "currency", "yen", "brokenbar", "section",
    "dieresis", "copyright", "ordfeminine", "guillemotleft", "logicalnot", "", "registered",
    "macron", "degree", "plusminus", "twosuperior", "threesuperior", "acute", "mu",
    "paragraph", "periodcentered", "cedilla", "onesuperior", "ordmasculine",
    "guillemotright", "onequarter", "onehalf", "threequarters", "questiondown",
    "Agrave", "Aacute", "Acircumflex", "Atilde", "Adieresis", "Aring", "AE", "Ccedilla",
    "Egrave", "Eacute", "Ecircumflex", "Edieresis", "Igrave", "Iacute", "Icircumflex",
    "Idieresis", "Eth", "Ntilde", "Ograve", "Oacute", "Ocircumflex", "Otilde", "Odieresis",
    "multiply", "Oslash", "Ugrave", "Uacute", "Ucircumflex", "Udieresis", "Yacute", "Thorn",
    "germandbls", "agrave", "aacute", "acircumflex", "atilde", "adieresis", "aring", "ae",
    "ccedilla", "egrave", "eacute", "ecircumflex", "edieresis", "igrave", "iacute",
    "icircumflex", "idieresis", "eth", "ntilde", "ograve", "oacute", "ocircumflex",
    "otilde", "odieresis", "divide", "oslash", "ugrave", "uacute", "ucircumflex",
    "udieresis", "yacute", "thorn", "ydieresis",
];

const WIN_ANSI_NAMES: [(u8, &str); 27] = [
    (0x80, "Euro"),
    (0x82, "quotesinglbase"),
    (0x83, "florin"),
    (0x84, "quotedblbase"),
    (0x85, "ellipsis"),
    (0x86, "dagger"),
    (0x87, "daggerdbl"),
    (0x88, "circumflex"),
    (0x89, "perthousand"),
    (0x8A, "Scaron"),
    (0x8B, "guilsinglleft"),
    (0x8C, "OE"),
    (0x8E, "Zcaron"),
    (0x91, "quoteleft"),
    (0x92, "quoteright"),
    (0x93, "quotedblleft"),
    (0x94, "quotedblright"),
    (0x95, "bullet"),
    (0x96, "endash"),
    (0x97, "emdash"),
    (0x98, "tilde"),
    (0x99, "trademark"),
    (0x9A, "scaron"),
    (0x9B, "guilsinglright"),
    (0x9C, "oe"),
    (0x9E, "zcaron"),
    (0x9F, "Ydieresis"),
];

const EXTRA_NAMES: [(&str, char); 18] = [
    ("fi", '\u{FB01}'),
    ("fl", '\u{FB02}'),
    ("ff", '\u{FB00}'),
    ("ffi", '\u{FB03}'),
    ("ffl", '\u{FB04}'),
    ("dotlessi", '\u{0131}'),
    ("Lslash", '\u{0141}'),
    ("lslash", '\u{0142}'),
    ("minus", '\u{2212}'),
    ("fraction", '\u{2044}'),
    ("nbspace", '\u{00A0}'),
    ("sfthyphen", '\u{00AD}'),
    ("breve", '\u{02D8}'),
    ("dotaccent", '\u{02D9}'),
    ("ring", '\u{02DA}'),
    ("hungarumlaut", '\u{02DD}'),
    ("ogonek", '\u{02DB}'),
    ("caron", '\u{02C7}'),
];

/// StandardEncoding above 0x7E
const STANDARD_HIGH: [(u8, &str); 55] = [
    (0xA1, "exclamdown"),
    (0xA2, "cent"),
    (0xA3, "sterling"),
    (0xA4, "fraction"),
    (0xA5, "yen"),
    (0xA6, "florin"),
    (0xA7, "section"),
    (0xA8, "currency"),
    (0xA9, "quotesingle"),
    (0xAA, "quotedblleft"),
    (0xAB, "guillemotleft"),
    (0xAC, "guilsinglleft"),
    (0xAD, "guilsinglright"),
    (0xAE, "fi"),
    (0xAF, "fl"),
    (0xB1, "endash"),
    (0xB2, "dagger"),
    (0xB3, "daggerdbl"),
    (0xB4, "periodcentered"),
    (0xB6, "paragraph"),
    (0xB7, "bullet"),
    (0xB8, "quotesinglbase"),
    (0xB9, "quotedblbase"),
    (0xBA, "quotedblright"),
    (0xBB, "guillemotright"),
    (0xBC, "ellipsis"),
    (0xBD, "perthousand"),
    (0xBF, "questiondown"),
    (0xC1, "grave"),
    (0xC2, "acute"),
    (0xC3, "circumflex"),
    (0xC4, "tilde"),
    (0xC5, "macron"),
    (0xC6, "breve"),
    (0xC7, "dotaccent"),
    (0xC8, "dieresis"),
    (0xCA, "ring"),
    (0xCB, "cedilla"),
    (0xCD, "hungarumlaut"),
    (0xCE, "ogonek"),
    (0xCF, "caron"),
    (0xD0, "emdash"),
    (0xE1, "AE"),
    (0xE3, "ordfeminine"),
    (0xE8, "Lslash"),
    (0xE9, "Oslash"),
    (0xEA, "OE"),
    (0xEB, "ordmasculine"),
    (0xF1, "ae"),
    (0xF5, "dotlessi"),
    (0xF8, "lslash"),
    (0xF9, "oslash"),
    (0xFA, "oe"),
    (0xFB, "germandbls"),
    (0xFC, "hungarumlaut"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_win_ansi_specials() {
        assert_eq!(win_ansi(b'A'), 'A');
        assert_eq!(win_ansi(0x92), '\u{2019}');
        assert_eq!(win_ansi(0xE9), 'é');
    }

    #[test]
    fn test_mac_roman_table() {
        assert_eq!(MAC_ROMAN_HIGH.chars().count(), 128);
        assert_eq!(mac_roman(0x8E), 'é');
        assert_eq!(mac_roman(0xD2), '\u{201C}');
        assert_eq!(mac_roman(b'z'), 'z');
    }

    #[test]
    fn test_standard_encoding() {
        assert_eq!(standard(0x27), '\u{2019}');
        assert_eq!(standard(0xAE), '\u{FB01}');
        assert_eq!(standard(0xD0), '\u{2014}');
        assert_eq!(standard(0x90), '\0');
    }

    #[test]
    fn test_glyph_names() {
        assert_eq!(glyph_unicode("P"), Some('P'));
        assert_eq!(glyph_unicode("seven"), Some('7'));
        assert_eq!(glyph_unicode("eacute"), Some('é'));
        assert_eq!(glyph_unicode("quoteright"), Some('\u{2019}'));
        assert_eq!(glyph_unicode("uni20AC"), Some('€'));
        assert_eq!(glyph_unicode("u1F600"), Some('\u{1F600}'));
        assert_eq!(glyph_unicode("a.sc"), Some('a'));
        assert_eq!(glyph_unicode(".notdef"), None);
        assert_eq!(glyph_unicode("g3"), None);
    }

    #[test]
    fn test_differences_override_base() {
        let doc = Document::with_version("1.5");
        let encoding = Object::Dictionary(dictionary! {
            "Type" => "Encoding",
            "BaseEncoding" => "MacRomanEncoding",
            "Differences" => vec![
                1.into(),
                Object::Name(b"P".to_vec()),
                Object::Name(b"a".to_vec()),
                Object::Name(b"y".to_vec()),
                0x41.into(),
                Object::Name(b"Euro".to_vec()),
            ],
        });

        let enc = SimpleEncoding::load(&doc, &encoding);
        let text: String = [1u8, 2, 3].iter().map(|&b| enc.decode(b)).collect();
        assert_eq!(text, "Pay");
        assert_eq!(enc.decode(0x41), '€');
        assert_eq!(enc.decode(0x42), 'B');
        assert_eq!(enc.decode(0x8E), 'é');
    }

    #[test]
    fn test_differences_stop_at_last_code() {
        let doc = Document::with_version("1.5");
        let items = vec![
            255.into(),
            Object::Name(b"A".to_vec()),
            Object::Name(b"B".to_vec()),
            300.into(),
            Object::Name(b"C".to_vec()),
        ];
        let map = parse_differences(&doc, &items);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&255), Some(&'A'));
    }
}
