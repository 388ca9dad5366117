use glam::Vec2;
use image::{GrayImage, Luma};

use crate::config::AtlasConfig;
use crate::error::{Result, SimError};

use super::glyphs::GlyphSource;

/// Largest atlas edge we are willing to allocate, in pixels.
const MAX_ATLAS_PX: u32 = 16384;

/// A fixed grid of equally sized glyph cells packed into one coverage image.
///
/// Glyph `i` lives in cell `(i mod cols, i div cols)`. UV origins follow the
/// texture convention used by the renderers: `u` grows right, `v` grows down,
/// row 0 is the top row of the image. A cell's origin is its top-left corner.
///
/// Built once; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphAtlas {
    charset: Vec<char>,
    cols: u32,
    rows: u32,
    cell_px: u32,
    image: GrayImage,
}

impl GlyphAtlas {
    /// Rasterizes `config.charset` into a `cols × rows` grid.
    ///
    /// Fails when the grid is empty, the charset is empty or does not fit.
    pub fn build(config: &AtlasConfig, glyphs: &dyn GlyphSource) -> Result<Self> {
        let AtlasConfig { charset, cols, rows, cell_px, glyph_px } = config;
        let (cols, rows, cell_px) = (*cols, *rows, *cell_px);

        if cols == 0 || rows == 0 {
            return Err(SimError::config(format!("atlas grid {cols}x{rows} has no cells")));
        }
        let capacity = cols
            .checked_mul(rows)
            .ok_or_else(|| SimError::config("atlas grid overflows"))?;

        let charset: Vec<char> = charset.chars().collect();
        if charset.is_empty() {
            return Err(SimError::config("atlas charset is empty"));
        }
        if (capacity as usize) < charset.len() {
            return Err(SimError::config(format!(
                "atlas grid {cols}x{rows} holds {capacity} glyphs, charset has {}",
                charset.len()
            )));
        }
        if cell_px == 0 {
            return Err(SimError::config("atlas cell size must be positive"));
        }
        config.check_glyph_px()?;

        let width = cols.checked_mul(cell_px).filter(|w| *w <= MAX_ATLAS_PX);
        let height = rows.checked_mul(cell_px).filter(|h| *h <= MAX_ATLAS_PX);
        let (Some(width), Some(height)) = (width, height) else {
            return Err(SimError::config(format!(
                "atlas of {cols}x{rows} cells at {cell_px}px exceeds {MAX_ATLAS_PX}px"
            )));
        };

        let mut image = GrayImage::new(width, height);
        for (index, ch) in charset.iter().enumerate() {
            let (col, row) = cell_of(index as u32, cols);
            let bitmap = glyphs.rasterize(*ch, *glyph_px);
            if bitmap.is_empty() {
                continue;
            }

            // Center the bitmap in its cell; anything larger than the cell is cropped.
            let off_x = (cell_px.saturating_sub(bitmap.width)) / 2;
            let off_y = (cell_px.saturating_sub(bitmap.height)) / 2;
            for y in 0..bitmap.height.min(cell_px) {
                for x in 0..bitmap.width.min(cell_px) {
                    let cov = bitmap.coverage[(y * bitmap.width + x) as usize];
                    if cov == 0 {
                        continue;
                    }
                    image.put_pixel(col * cell_px + off_x + x, row * cell_px + off_y + y, Luma([cov]));
                }
            }
        }

        log::debug!(
            "glyph atlas: {} glyphs in {cols}x{rows} cells, {width}x{height}px",
            charset.len()
        );

        Ok(Self { charset, cols, rows, cell_px, image })
    }

    /// Number of glyphs actually packed (the valid glyph index range).
    pub fn glyph_count(&self) -> u32 {
        self.charset.len() as u32
    }

    /// Total number of cells in the grid.
    pub fn capacity(&self) -> u32 {
        self.cols * self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_px(&self) -> u32 {
        self.cell_px
    }

    /// Character stored at `index`.
    pub fn glyph(&self, index: u32) -> Option<char> {
        self.charset.get(index as usize).copied()
    }

    /// Size of one cell in UV units.
    pub fn cell_size(&self) -> Vec2 {
        Vec2::new(1.0 / self.cols as f32, 1.0 / self.rows as f32)
    }

    /// UV origin (top-left) of the cell holding glyph `index`.
    ///
    /// Returns `None` for indices outside the packed charset.
    pub fn cell_uv(&self, index: u32) -> Option<Vec2> {
        if index >= self.glyph_count() {
            return None;
        }
        let (col, row) = cell_of(index, self.cols);
        Some(Vec2::new(col as f32 / self.cols as f32, row as f32 / self.rows as f32))
    }

    /// Coverage image, `cols * cell_px` by `rows * cell_px`.
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Nearest-texel coverage at `uv`, in `[0, 1]`. UVs are clamped to the edge.
    pub fn coverage_at(&self, uv: Vec2) -> f32 {
        let (w, h) = self.image.dimensions();
        let x = ((uv.x * w as f32).floor().max(0.0) as u32).min(w - 1);
        let y = ((uv.y * h as f32).floor().max(0.0) as u32).min(h - 1);
        f32::from(self.image.get_pixel(x, y).0[0]) / 255.0
    }
}

fn cell_of(index: u32, cols: u32) -> (u32, u32) {
    (index % cols, index / cols)
}
