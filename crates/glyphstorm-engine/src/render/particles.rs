use bytemuck::{Pod, Zeroable};
use glyphstorm_sim::{FrameView, GlyphAtlas, Result, SimError};
use wgpu::util::DeviceExt;

use crate::render::{Camera, RenderCtx, RenderStyle, RenderTarget};

use super::instances::{build_instances, ParticleInstance, QuadVertex, QUAD_INDICES, QUAD_VERTICES};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// GPU renderer for the particle field.
///
/// Draws one instanced quad per particle. Resources are created lazily on
/// first use and rebuilt only when their inputs change:
///
/// - pipeline: surface format
/// - position texture: grid side
/// - atlas texture + instance table: core bindings generation
/// - depth buffer: target size
pub struct ParticleRenderer {
    // pipeline
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,

    // bindings (rebuilt when a bound texture changes)
    uniform_buffer: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
    texture_generation: u64,
    bind_group_generation: u64,

    // particle state
    positions: Option<(u32, wgpu::Texture, wgpu::TextureView)>,

    // glyphs
    atlas_view: Option<wgpu::TextureView>,
    instance_vbo: Option<wgpu::Buffer>,
    instance_count: u32,
    bindings_generation: Option<u64>,

    // depth
    depth: Option<((u32, u32), wgpu::TextureView)>,

    // geometry
    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,
}

impl Default for ParticleRenderer {
    fn default() -> Self {
        Self {
            pipeline_format: None,
            pipeline: None,
            bind_group_layout: None,
            uniform_buffer: None,
            bind_group: None,
            texture_generation: 0,
            bind_group_generation: u64::MAX,
            positions: None,
            atlas_view: None,
            instance_vbo: None,
            instance_count: 0,
            bindings_generation: None,
            depth: None,
            quad_vbo: None,
            quad_ibo: None,
        }
    }
}

impl ParticleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that the device can hold the position texture and the atlas.
    pub fn supports(limits: &wgpu::Limits, frame: &FrameView<'_>) -> Result<()> {
        let max = limits.max_texture_dimension_2d;
        if frame.side > max {
            return Err(SimError::RuntimeUnavailable(format!(
                "{0}x{0} position texture exceeds the device limit of {max}",
                frame.side
            )));
        }
        let (w, h) = frame.atlas.image().dimensions();
        if w > max || h > max {
            return Err(SimError::RuntimeUnavailable(format!(
                "{w}x{h} glyph atlas exceeds the device limit of {max}"
            )));
        }
        Ok(())
    }

    /// Draws the current frame. Reads `frame`; mutates nothing but GPU resources.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        frame: &FrameView<'_>,
        camera: &Camera,
        style: &RenderStyle,
    ) -> Result<()> {
        Self::supports(&ctx.device.limits(), frame)?;

        self.ensure_pipeline(ctx);
        self.ensure_static_buffers(ctx);
        self.ensure_depth(ctx);
        self.ensure_position_texture(ctx, frame.side);
        self.ensure_glyphs(ctx, frame)?;
        self.ensure_bindings(ctx);

        self.write_positions(ctx, frame);
        self.write_uniforms(ctx, frame.atlas, camera, style);

        let Some(pipeline) = self.pipeline.as_ref() else { return Ok(()); };
        let Some(bind_group) = self.bind_group.as_ref() else { return Ok(()); };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return Ok(()); };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return Ok(()); };
        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return Ok(()); };
        let Some((_, depth_view)) = self.depth.as_ref() else { return Ok(()); };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("glyphstorm particle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..self.instance_count);
        Ok(())
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glyphstorm particle shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/particles.wgsl").into()),
        });

        let unfiltered = |binding, visibility| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glyphstorm particle bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ParticleUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                unfiltered(1, wgpu::ShaderStages::VERTEX),
                unfiltered(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glyphstorm particle pipeline layout"),
            bind_group_layouts: &[&bgl],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("glyphstorm particle pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), ParticleInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    // Hard cutout: fragments are either discarded or opaque.
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bgl);
        self.bind_group = None;
        self.bind_group_generation = u64::MAX;
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }
        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glyphstorm quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glyphstorm quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn ensure_depth(&mut self, ctx: &RenderCtx<'_>) {
        let size = ctx.target_size;
        if matches!(&self.depth, Some((s, _)) if *s == size) {
            return;
        }
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glyphstorm depth"),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some((size, view));
    }

    fn ensure_position_texture(&mut self, ctx: &RenderCtx<'_>, side: u32) {
        if matches!(&self.positions, Some((s, _, _)) if *s == side) {
            return;
        }
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glyphstorm position texture"),
            size: wgpu::Extent3d {
                width: side,
                height: side,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("position texture {side}x{side} created");

        self.positions = Some((side, texture, view));
        self.texture_generation += 1;
    }

    /// Uploads the atlas and the instance table when the bindings change.
    fn ensure_glyphs(&mut self, ctx: &RenderCtx<'_>, frame: &FrameView<'_>) -> Result<()> {
        if self.bindings_generation == Some(frame.bindings_generation) && self.instance_vbo.is_some() {
            return Ok(());
        }

        let instances = build_instances(frame.bindings, frame.atlas)?;
        self.instance_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glyphstorm instance vbo"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.instance_count = instances.len() as u32;

        let image = frame.atlas.image();
        let (width, height) = image.dimensions();
        let texture = ctx.device.create_texture_with_data(
            ctx.queue,
            &wgpu::TextureDescriptor {
                label: Some("glyphstorm atlas"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            image.as_raw(),
        );
        self.atlas_view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));

        log::debug!(
            "uploaded {} instances and a {width}x{height} atlas (generation {})",
            self.instance_count,
            frame.bindings_generation
        );
        self.bindings_generation = Some(frame.bindings_generation);
        self.texture_generation += 1;
        Ok(())
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.bind_group_generation == self.texture_generation && self.bind_group.is_some() {
            return;
        }

        let Some(bgl) = self.bind_group_layout.as_ref() else { return; };
        let Some((_, _, position_view)) = self.positions.as_ref() else { return; };
        let Some(atlas_view) = self.atlas_view.as_ref() else { return; };

        let uniform_buffer = self.uniform_buffer.get_or_insert_with(|| {
            ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("glyphstorm particle ubo"),
                size: std::mem::size_of::<ParticleUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glyphstorm particle bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(position_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(atlas_view),
                },
            ],
        });

        self.bind_group = Some(bind_group);
        self.bind_group_generation = self.texture_generation;
    }

    fn write_positions(&self, ctx: &RenderCtx<'_>, frame: &FrameView<'_>) {
        let Some((side, texture, _)) = self.positions.as_ref() else { return; };
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(frame.positions),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(side * std::mem::size_of::<glam::Vec4>() as u32),
                rows_per_image: Some(*side),
            },
            wgpu::Extent3d {
                width: *side,
                height: *side,
                depth_or_array_layers: 1,
            },
        );
    }

    fn write_uniforms(&self, ctx: &RenderCtx<'_>, atlas: &GlyphAtlas, camera: &Camera, style: &RenderStyle) {
        let Some(ubo) = self.uniform_buffer.as_ref() else { return; };
        let side = self.positions.as_ref().map_or(0, |(s, _, _)| *s);
        let cell = atlas.cell_size();

        let ink = style.ink.for_target(ctx.surface_format.is_srgb());

        let uniforms = ParticleUniforms {
            view: camera.view().to_cols_array_2d(),
            proj: camera.projection(ctx.aspect()).to_cols_array_2d(),
            params: [cell.x, cell.y, style.quad_size, style.alpha_threshold],
            ink,
            grid: [side, 0, 0, 0],
        };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&uniforms));
    }
}

/// Uniform block (176 bytes), mirrors `Uniforms` in particles.wgsl.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ParticleUniforms {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    params: [f32; 4],
    ink: [f32; 4],
    grid: [u32; 4],
}

#[cfg(test)]
mod tests {
    use glyphstorm_sim::{AtlasConfig, BlockGlyphs, ParticleCore, SimulationConfig};

    use super::*;

    fn core(side: u32) -> ParticleCore {
        let mut core = ParticleCore::new();
        let cfg = SimulationConfig {
            grid_side: side,
            seed: Some(1),
            atlas: AtlasConfig { cell_px: 8, glyph_px: 6.0, ..Default::default() },
            ..Default::default()
        };
        core.initialize(cfg, &BlockGlyphs).unwrap();
        core
    }

    #[test]
    fn uniform_block_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<ParticleUniforms>(), 176);
    }

    #[test]
    fn oversized_grid_is_runtime_unavailable() {
        let limits = wgpu::Limits { max_texture_dimension_2d: 16, ..wgpu::Limits::default() };
        let ok = core(16);
        assert!(ParticleRenderer::supports(&limits, &ok.frame().unwrap()).is_err());

        let limits = wgpu::Limits { max_texture_dimension_2d: 128, ..wgpu::Limits::default() };
        assert!(ParticleRenderer::supports(&limits, &ok.frame().unwrap()).is_ok());

        let big = core(129);
        assert!(matches!(
            ParticleRenderer::supports(&limits, &big.frame().unwrap()),
            Err(SimError::RuntimeUnavailable(_))
        ));
    }
}
