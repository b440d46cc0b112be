//! Glyph rasterizer.
//!
//! Decodes one character of a [`Font`] into a row bitmask. Bit `x` of
//! `bitmap[y]` is the pixel in column `x` of row `y`, counted from the
//! top-left corner.

use std::collections::HashMap;

use crate::font::{END_OF_FONT, Font, FontKind, RECORD_HEADER_LEN, decode_offset, packed_len};

/// Rows a glyph can hold.
pub const MAX_GLYPH_HEIGHT: usize = 32;

/// Columns a glyph can hold.
const MAX_GLYPH_WIDTH: i32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub width: i32,
    pub height: i32,
    pub bitmap: [u32; MAX_GLYPH_HEIGHT],
}

impl Glyph {
    fn blank(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            bitmap: [0; MAX_GLYPH_HEIGHT],
        }
    }

    pub fn is_set(&self, x: i32, y: i32) -> bool {
        (0..MAX_GLYPH_WIDTH).contains(&x)
            && (0..self.height).contains(&y)
            && self.bitmap[y as usize] & (1 << x) != 0
    }

    pub fn is_blank(&self) -> bool {
        self.bitmap.iter().all(|&row| row == 0)
    }
}

/// Rasterize `c` from `font`, rescaled vertically to `points` rows when that
/// differs from the font's native height (0 keeps the native height).
///
/// Never fails: characters the font lacks come out blank, with the font's
/// declared cell width. A newline is always zero width.
pub fn render_glyph(font: &Font, points: i32, c: char) -> Glyph {
    let native = i32::from(font.height).min(MAX_GLYPH_HEIGHT as i32);
    let default_width = if font.width == 0 { 8 } else { i32::from(font.width) };
    let mut out = Glyph::blank(default_width, native);

    if c == '\n' {
        out.width = 0;
    } else {
        match font.kind {
            FontKind::Bitmap { rows } => decode_bitmap(font, rows, c, &mut out),
            FontKind::Proportional { data } => decode_proportional(data, c, &mut out),
        }
    }

    if points > 0 && points != native {
        let points = points.min(MAX_GLYPH_HEIGHT as i32);
        let source = out;
        out.height = points;
        for y in 0..points {
            // Nearest neighbour: output row y samples floor(y / (points / native)).
            let src = (y * native / points) as usize;
            out.bitmap[y as usize] = source.bitmap[src];
        }
    }
    out
}

fn decode_bitmap(font: &Font, rows: &[u8], c: char, out: &mut Glyph) {
    let code = c as usize;
    if code >= usize::from(font.chars) {
        return;
    }
    let height = out.height as usize;
    let start = code * usize::from(font.height);
    for y in 0..height {
        if let Some(&row) = rows.get(start + y) {
            out.bitmap[y] = u32::from(row);
        }
    }
}

fn decode_proportional(data: &[u8], c: char, out: &mut Glyph) {
    let mut pos = 0;
    while let Some(header) = data.get(pos..pos + RECORD_HEADER_LEN) {
        let [code, y_offset, width, height, x_offset, x_advance] = [
            header[0], header[1], header[2], header[3], header[4], header[5],
        ];
        if code == END_OF_FONT {
            return;
        }
        pos += RECORD_HEADER_LEN;
        let payload = packed_len(width, height);
        if u32::from(code) != c as u32 {
            pos += payload;
            continue;
        }

        out.width = i32::from(width.max(x_advance));
        let x_offset = decode_offset(x_offset);
        let bits = data.get(pos..pos + payload).unwrap_or(&[]);
        let mut index = 0usize;
        for y in 0..usize::from(height) {
            for x in 0..i32::from(width) {
                let byte = bits.get(index / 8).copied().unwrap_or(0);
                let set = byte & (0x80 >> (index % 8)) != 0;
                index += 1;
                let row = usize::from(y_offset) + y;
                let col = x_offset + x;
                if set && row < MAX_GLYPH_HEIGHT && (0..MAX_GLYPH_WIDTH).contains(&col) {
                    out.bitmap[row] |= 1 << col;
                }
            }
        }
        return;
    }
}

/// Memoizes rendered glyphs by (font type, points, character).
#[derive(Debug, Default)]
pub struct GlyphCache {
    glyphs: HashMap<(usize, i32, char), Glyph>,
    hits: u64,
    misses: u64,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, font_type: usize, font: &Font, points: i32, c: char) -> Glyph {
        if let Some(glyph) = self.glyphs.get(&(font_type, points, c)) {
            self.hits += 1;
            return *glyph;
        }
        self.misses += 1;
        let glyph = render_glyph(font, points, c);
        self.glyphs.insert((font_type, points, c), glyph);
        glyph
    }

    pub fn clear(&mut self) {
        self.glyphs.clear();
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
