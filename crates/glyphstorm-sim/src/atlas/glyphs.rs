use crate::error::{Result, SimError};

/// Bitmaps wider than this are never produced; callers get an empty glyph.
pub(crate) const MAX_GLYPH_EDGE: u32 = 16384;

/// Coverage bitmap for a single glyph (one byte per pixel, row-major).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Anything that can turn a character into a coverage bitmap.
///
/// Implementations must be deterministic: the atlas is built once and its
/// contents are part of the render contract.
pub trait GlyphSource {
    fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap;
}

/// Glyphs rasterized from a TrueType/OpenType font via fontdue.
pub struct FontGlyphs {
    font: fontdue::Font,
}

impl FontGlyphs {
    /// Parses a font from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| SimError::config(format!("font load error: {e}")))?;
        Ok(Self { font })
    }
}

impl GlyphSource for FontGlyphs {
    fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap {
        if !(px > 0.0 && px <= MAX_GLYPH_EDGE as f32) {
            return GlyphBitmap::default();
        }
        let (metrics, coverage) = self.font.rasterize(ch, px);
        GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            coverage,
        }
    }
}

/// Procedural stand-in used when no font is available.
///
/// Each character maps to a left/right-symmetric 5×5 block pattern derived
/// from its code point, so distinct characters stay visually distinct.
#[derive(Debug, Copy, Clone, Default)]
pub struct BlockGlyphs;

const BLOCKS: u32 = 5;

impl BlockGlyphs {
    /// 15 bits: 3 independent columns × 5 rows, mirrored onto 5 columns.
    fn pattern(ch: char) -> u32 {
        // FNV-1a over the code point bytes.
        let mut h: u32 = 0x811c_9dc5;
        for b in (ch as u32).to_le_bytes() {
            h ^= u32::from(b);
            h = h.wrapping_mul(0x0100_0193);
        }
        let bits = h & 0x7fff;
        if bits == 0 { 1 << 7 } else { bits }
    }

    fn filled(pattern: u32, col: u32, row: u32) -> bool {
        let c = if col > 2 { BLOCKS - 1 - col } else { col };
        pattern & (1 << (row * 3 + c)) != 0
    }
}

impl GlyphSource for BlockGlyphs {
    fn rasterize(&self, ch: char, px: f32) -> GlyphBitmap {
        if ch.is_whitespace() {
            return GlyphBitmap::default();
        }

        let block = ((px / BLOCKS as f32).floor() as u32).max(1);
        let size = match block.checked_mul(BLOCKS) {
            Some(size) if size <= MAX_GLYPH_EDGE => size,
            _ => return GlyphBitmap::default(),
        };
        let pattern = Self::pattern(ch);

        let side = size as usize;
        let mut coverage = vec![0u8; side * side];
        for (i, texel) in coverage.iter_mut().enumerate() {
            let (x, y) = ((i % side) as u32, (i / side) as u32);
            if Self::filled(pattern, x / block, y / block) {
                *texel = 255;
            }
        }

        GlyphBitmap { width: size, height: size, coverage }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_glyphs_are_deterministic_and_square() {
        let a = BlockGlyphs.rasterize('Q', 48.0);
        let b = BlockGlyphs.rasterize('Q', 48.0);
        assert_eq!(a, b);
        assert_eq!(a.width, 45);
        assert_eq!(a.height, 45);
        assert_eq!(a.coverage.len(), 45 * 45);
    }

    #[test]
    fn block_glyphs_are_never_blank() {
        for ch in crate::config::DEFAULT_CHARSET.chars() {
            let g = BlockGlyphs.rasterize(ch, 20.0);
            assert!(g.coverage.iter().any(|&c| c == 255), "{ch} rendered blank");
        }
    }

    #[test]
    fn block_glyphs_are_mirrored() {
        let g = BlockGlyphs.rasterize('k', 10.0);
        let size = g.width as usize;
        for y in 0..size {
            for x in 0..size {
                assert_eq!(g.coverage[y * size + x], g.coverage[y * size + (size - 1 - x)]);
            }
        }
    }

    #[test]
    fn oversized_block_glyph_is_empty() {
        assert!(BlockGlyphs.rasterize('A', 70_000.0).is_empty());
        assert!(BlockGlyphs.rasterize('A', f32::MAX).is_empty());
        assert!(!BlockGlyphs.rasterize('A', 64.0).is_empty());
    }

    #[test]
    fn whitespace_is_empty() {
        assert!(BlockGlyphs.rasterize(' ', 32.0).is_empty());
    }

    const MONO: &[u8] = include_bytes!("../../tests/fonts/DejaVuSansMono.ttf");

    #[test]
    fn font_glyphs_rasterize_real_outlines() {
        let font = FontGlyphs::from_bytes(MONO).unwrap();
        let a = font.rasterize('A', 32.0);
        assert!(!a.is_empty());
        assert_eq!(a.coverage.len(), (a.width * a.height) as usize);
        assert!(a.coverage.iter().any(|&c| c > 200));
        assert!(a.width <= 32 && a.height <= 32, "{}x{}", a.width, a.height);
        assert_eq!(font.rasterize('A', 32.0), a);

        // Distinct characters give distinct coverage.
        assert_ne!(font.rasterize('O', 32.0).coverage, a.coverage);
    }

    #[test]
    fn font_glyphs_skip_unreasonable_sizes() {
        let font = FontGlyphs::from_bytes(MONO).unwrap();
        assert!(font.rasterize('A', 70_000.0).is_empty());
        assert!(font.rasterize('A', f32::NAN).is_empty());
    }

    #[test]
    fn garbage_font_bytes_are_rejected() {
        assert!(matches!(FontGlyphs::from_bytes(b"not a font"), Err(SimError::Configuration(_))));
    }
}
