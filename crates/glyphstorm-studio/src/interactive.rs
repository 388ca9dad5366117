//! Windowed mode: the GPU renderer driven by live pointer input.

use std::path::PathBuf;

use glyphstorm_engine::core::{App, AppControl, FrameCtx};
use glyphstorm_engine::input::Key;
use glyphstorm_engine::render::{Camera, ParticleRenderer, RenderStyle};
use glyphstorm_sim::{ParticleCore, SimError, TickInput};

use crate::setup;

pub struct StudioApp {
    core: ParticleCore,
    renderer: ParticleRenderer,
    camera: Camera,
    style: RenderStyle,
    title: String,
    glyphs_path: PathBuf,
    paused: bool,

    /// Set when the core or the renderer fails; the loop exits right after.
    failure: Option<SimError>,
}

impl StudioApp {
    pub fn new(core: ParticleCore, title: String, glyphs_path: PathBuf) -> Self {
        Self {
            core,
            renderer: ParticleRenderer::new(),
            camera: Camera::default(),
            style: RenderStyle::default(),
            title,
            glyphs_path,
            paused: false,
            failure: None,
        }
    }

    /// The error that stopped the loop, if any.
    pub fn into_failure(self) -> Option<SimError> {
        self.failure
    }

    fn fail(&mut self, err: SimError) -> AppControl {
        log::error!("{err}");
        self.failure = Some(err);
        AppControl::Exit
    }

    fn handle_keys(&mut self, ctx: &FrameCtx<'_, '_>) -> Option<AppControl> {
        let pressed = |key| ctx.input_frame.key_pressed(key);

        if pressed(Key::Escape) {
            return Some(AppControl::Exit);
        }
        if pressed(Key::Space) {
            self.paused = !self.paused;
            let title = if self.paused { format!("{} (paused)", self.title) } else { self.title.clone() };
            ctx.window.set_title(&title);
        }
        if pressed(Key::R) {
            if let Err(e) = self.core.reset() {
                return Some(self.fail(e));
            }
            log::info!("particles reset");
        }
        if pressed(Key::S) {
            if let Err(e) = setup::save_glyphs(&self.core, &self.glyphs_path) {
                log::warn!("{e:#}");
            }
        }
        None
    }
}

impl App for StudioApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if let Some(control) = self.handle_keys(ctx) {
            return control;
        }

        if !self.paused {
            let cursor = ctx.input.pointer_ndc(ctx.window.logical_size());
            let input = TickInput::new(cursor, ctx.input.pressed(), ctx.time.elapsed);
            if let Err(e) = self.core.step(input) {
                return self.fail(e);
            }
        }

        let frame = match self.core.frame() {
            Ok(frame) => frame,
            Err(e) => return self.fail(e),
        };

        let mut result = Ok(());
        let renderer = &mut self.renderer;
        let (camera, style) = (&self.camera, &self.style);
        let control = ctx.render(style.paper, |rctx, target| {
            result = renderer.render(rctx, target, &frame, camera, style);
        });

        match result {
            Ok(()) => control,
            Err(e) => self.fail(e),
        }
    }
}
