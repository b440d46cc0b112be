//! Compiled-in fonts.
//!
//! Two encodings are supported. Bitmap fonts store one byte per row for every
//! character below `chars`. Proportional fonts are a stream of records:
//!
//! ```text
//! code, y_offset, width, height, x_offset, x_advance, packed bits...
//! ```
//!
//! The packed bits are row-major, most significant bit first, and take
//! `ceil(width * height / 8)` bytes (none when `width` is 0). A record with
//! code `0xFF` ends the stream. `x_offset` uses the encoding decoded by
//! [`decode_offset`].

use std::sync::LazyLock;

use crate::font_data::BASIC_8X8;

/// Code of the record that ends a proportional stream.
pub const END_OF_FONT: u8 = 0xFF;

/// Size of a proportional record header.
pub const RECORD_HEADER_LEN: usize = 6;

#[derive(Debug, Clone, Copy)]
pub enum FontKind {
    Bitmap { rows: &'static [u8] },
    Proportional { data: &'static [u8] },
}

/// An immutable font.
#[derive(Debug, Clone, Copy)]
pub struct Font {
    pub name: &'static str,
    /// Cell width for bitmap fonts, nominal width for proportional ones
    /// (0 means 8).
    pub width: u8,
    pub height: u8,
    /// Number of characters in a bitmap font.
    pub chars: u16,
    pub kind: FontKind,
}

/// Geometry of the active font selection.
#[derive(Debug, Clone, Copy)]
pub struct FontInfo {
    pub font_type: usize,
    pub font: &'static Font,
    pub points: i32,
    pub width: i32,
    pub height: i32,
}

impl FontInfo {
    /// Geometry for entry `font_type` of [`fonts`]. Types below 3 scale the
    /// bitmap font to `8 + type * 4` points, the others use their native
    /// height.
    pub fn for_type(font_type: usize) -> Option<Self> {
        let font = fonts().get(font_type)?;
        let points = if font_type < 3 {
            8 + font_type as i32 * 4
        } else {
            i32::from(font.height)
        };
        Some(Self {
            font_type,
            font,
            points,
            width: i32::from(font.width).max(4),
            height: points,
        })
    }
}

/// Signed offset stored in one byte: values from `0x80` up are negative,
/// `0xFF` being 0 and `0x80` being -127.
pub const fn decode_offset(raw: u8) -> i32 {
    if raw < 0x80 {
        raw as i32
    } else {
        -(0xFF - raw as i32)
    }
}

/// Bytes of packed pixel data following a record header.
pub const fn packed_len(width: u8, height: u8) -> usize {
    let bits = width as usize * height as usize;
    if bits == 0 { 0 } else { (bits - 1) / 8 + 1 }
}

/// Re-encode an 8-row bitmap font as a proportional stream: each glyph is
/// trimmed to its inked columns and rows and advances one pixel past its
/// right edge. Blank glyphs get zero width and a fixed advance.
fn pack_proportional(rows: &[u8], first: u8, last: u8, blank_advance: u8) -> Vec<u8> {
    let mut out = Vec::new();
    for code in first..=last {
        let glyph = &rows[code as usize * 8..code as usize * 8 + 8];
        let inked: Vec<usize> = (0..8).filter(|&y| glyph[y] != 0).collect();
        let mask = glyph.iter().fold(0u8, |acc, r| acc | r);
        let (Some(&top), Some(&bottom)) = (inked.first(), inked.last()) else {
            out.extend_from_slice(&[code, 0, 0, 0, 0, blank_advance]);
            continue;
        };
        let left = mask.trailing_zeros() as u8;
        let right = 7 - mask.leading_zeros() as u8;
        let width = right - left + 1;
        let height = (bottom - top + 1) as u8;
        out.extend_from_slice(&[code, top as u8, width, height, 0, width + 1]);

        let mut byte = 0u8;
        let mut bit = 0;
        for row in &glyph[top..=bottom] {
            for x in left..=right {
                if row & (1 << x) != 0 {
                    byte |= 0x80 >> bit;
                }
                bit += 1;
                if bit == 8 {
                    out.push(byte);
                    byte = 0;
                    bit = 0;
                }
            }
        }
        if bit != 0 {
            out.push(byte);
        }
    }
    out.extend_from_slice(&[END_OF_FONT, 0, 0, 0, 0, 0]);
    out
}

static SANS_8_DATA: LazyLock<Vec<u8>> =
    LazyLock::new(|| pack_proportional(&BASIC_8X8, 0x21, 0x7E, 3));

static FONTS: LazyLock<[Font; 4]> = LazyLock::new(|| {
    let basic = Font {
        name: "Basic",
        width: 8,
        height: 8,
        chars: 128,
        kind: FontKind::Bitmap { rows: &BASIC_8X8 },
    };
    [
        basic,
        basic,
        basic,
        Font {
            name: "Sans",
            width: 0,
            height: 8,
            chars: 0,
            kind: FontKind::Proportional {
                data: SANS_8_DATA.as_slice(),
            },
        },
    ]
});

/// Every selectable font type, indexed by font type number.
pub fn fonts() -> &'static [Font] {
    FONTS.as_slice()
}

/// Short label of a font type for the settings menu.
pub fn font_label(font_type: usize) -> String {
    match FontInfo::for_type(font_type) {
        Some(info) => format!("{} {}", info.font.name, info.points),
        None => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_decoding() {
        assert_eq!(decode_offset(0), 0);
        assert_eq!(decode_offset(0x7F), 127);
        assert_eq!(decode_offset(0xFF), 0);
        assert_eq!(decode_offset(0xFE), -1);
        assert_eq!(decode_offset(0x80), -127);
    }

    #[test]
    fn packed_len_rounds_up() {
        assert_eq!(packed_len(0, 8), 0);
        assert_eq!(packed_len(1, 8), 1);
        assert_eq!(packed_len(3, 3), 2);
        assert_eq!(packed_len(8, 8), 8);
    }

    #[test]
    fn font_types_and_points() {
        assert_eq!(fonts().len(), 4);
        let points: Vec<i32> = (0..4)
            .map(|t| FontInfo::for_type(t).unwrap().points)
            .collect();
        assert_eq!(points, vec![8, 12, 16, 8]);
        assert!(FontInfo::for_type(4).is_none());
    }

    #[test]
    fn proportional_width_floor() {
        let info = FontInfo::for_type(3).unwrap();
        assert_eq!(info.width, 4);
        assert_eq!(info.height, 8);
    }

    #[test]
    fn packed_stream_is_terminated() {
        let data = SANS_8_DATA.as_slice();
        assert!(data.len() > RECORD_HEADER_LEN);
        let tail = &data[data.len() - RECORD_HEADER_LEN..];
        assert_eq!(tail[0], END_OF_FONT);
    }

    #[test]
    fn packed_records_walk_to_terminator() {
        let data = SANS_8_DATA.as_slice();
        let mut pos = 0;
        let mut codes = Vec::new();
        while data[pos] != END_OF_FONT {
            codes.push(data[pos]);
            pos += RECORD_HEADER_LEN + packed_len(data[pos + 2], data[pos + 3]);
        }
        assert_eq!(pos + RECORD_HEADER_LEN, data.len());
        assert_eq!(codes.first(), Some(&0x21));
        assert_eq!(codes.last(), Some(&0x7E));
        assert_eq!(codes.len(), 0x7E - 0x21 + 1);
    }

    #[test]
    fn exclamation_mark_is_trimmed() {
        // '!' occupies columns 2..=5 and rows 0..=6 in the bitmap font.
        let data = SANS_8_DATA.as_slice();
        assert_eq!(&data[..RECORD_HEADER_LEN], &[b'!', 0, 4, 7, 0, 5]);
    }

    #[test]
    fn labels() {
        assert_eq!(font_label(1), "Basic 12");
        assert_eq!(font_label(3), "Sans 8");
        assert_eq!(font_label(9), "?");
    }
}
