//! Glyph atlas: one coverage image packed with fixed-size glyph cells.

mod builder;
mod glyphs;

pub use builder::GlyphAtlas;
pub use glyphs::{BlockGlyphs, FontGlyphs, GlyphBitmap, GlyphSource};
