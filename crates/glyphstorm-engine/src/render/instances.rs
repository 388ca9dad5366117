//! Per-instance table shared by the GPU and software renderers.

use bytemuck::{Pod, Zeroable};
use glyphstorm_sim::{GlyphAtlas, InstanceBindings, Result, SimError};

/// One particle's draw data: where to read its position and which atlas
/// cell to show.
///
/// Layout (16 bytes):
///
///  offset 0  reference  [f32; 2]  loc 1
///  offset 8  uv_offset  [f32; 2]  loc 2
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub reference: [f32; 2],
    pub uv_offset: [f32; 2],
}

impl ParticleInstance {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        1 => Float32x2, // reference
        2 => Float32x2  // uv_offset
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// Resolves every binding to its atlas cell, in particle order.
pub fn build_instances(bindings: &InstanceBindings, atlas: &GlyphAtlas) -> Result<Vec<ParticleInstance>> {
    bindings
        .iter()
        .map(|(reference, glyph)| {
            let uv = atlas.cell_uv(glyph).ok_or_else(|| {
                SimError::Configuration(format!(
                    "glyph {glyph} is outside the atlas ({} glyphs)",
                    atlas.glyph_count()
                ))
            })?;
            Ok(ParticleInstance {
                reference: reference.to_array(),
                uv_offset: uv.to_array(),
            })
        })
        .collect()
}

/// Unit quad corner; `(0, 0)` is bottom-left in view space.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct QuadVertex {
    pub corner: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub(crate) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [0.0, 0.0] },
    QuadVertex { corner: [1.0, 0.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [0.0, 1.0] },
];

pub(crate) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

#[cfg(test)]
mod tests {
    use glyphstorm_sim::{AtlasConfig, BlockGlyphs, GlyphAssignment};

    use super::*;

    fn atlas() -> GlyphAtlas {
        let cfg = AtlasConfig { charset: "ABCD".into(), cols: 2, rows: 2, cell_px: 8, glyph_px: 6.0 };
        GlyphAtlas::build(&cfg, &BlockGlyphs).unwrap()
    }

    #[test]
    fn instances_follow_bindings() {
        let assignment = GlyphAssignment::from_json(r#"{"grid_side":2,"glyphs":[3,0,1,2]}"#).unwrap();
        let bindings = InstanceBindings::with_assignment(2, 4, assignment).unwrap();
        let table = build_instances(&bindings, &atlas()).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table[0], ParticleInstance { reference: [0.0, 0.0], uv_offset: [0.5, 0.5] });
        assert_eq!(table[1], ParticleInstance { reference: [0.5, 0.0], uv_offset: [0.0, 0.0] });
        assert_eq!(table[2], ParticleInstance { reference: [0.0, 0.5], uv_offset: [0.5, 0.0] });
        assert_eq!(table[3], ParticleInstance { reference: [0.5, 0.5], uv_offset: [0.0, 0.5] });
    }

    #[test]
    fn instance_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 16);
    }
}
