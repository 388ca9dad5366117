//! glyphstorm: a field of glyph particles pulled around by the cursor.
//!
//! Keys: `R` re-seeds particles and glyphs, `Space` pauses, `S` saves the
//! glyph assignment, `Escape` quits. Holding a mouse button repels.

mod cli;
mod headless;
mod interactive;
mod setup;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use glyphstorm_engine::device::{is_runtime_unavailable, GpuInit};
use glyphstorm_engine::logging::{init_logging, LoggingConfig};
use glyphstorm_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use crate::cli::Cli;
use crate::interactive::StudioApp;

/// Where a GPU-less interactive run writes its capture.
const FALLBACK_CAPTURE: &str = "glyphstorm.png";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(match &cli.log {
        Some(filter) => LoggingConfig::with_filter(filter.clone()),
        None => LoggingConfig::default(),
    });

    let mut core = setup::build_core(&cli)?;

    if let Some(out) = &cli.headless {
        return headless::run(&mut core, cli.frames, cli.width, cli.height, out);
    }

    let glyphs_path = cli.save_glyphs.clone().unwrap_or_else(setup::default_glyphs_path);
    let config = RuntimeConfig {
        title: "glyphstorm".to_string(),
        initial_size: LogicalSize::new(f64::from(cli.width), f64::from(cli.height)),
    };
    let app = StudioApp::new(core, config.title.clone(), glyphs_path);

    let outcome = Runtime::run(config, GpuInit::default(), app).and_then(|app| match app.into_failure() {
        Some(err) => Err(err).context("render loop stopped"),
        None => Ok(()),
    });

    match outcome {
        Err(err) if is_runtime_unavailable(&err) => {
            log::warn!("{err:#}");
            log::warn!("no usable GPU, writing a software capture to {FALLBACK_CAPTURE} instead");
            fallback_capture(&cli, Path::new(FALLBACK_CAPTURE))
        }
        other => other,
    }
}

/// Software capture with a fresh core; the interactive one went down with
/// the event loop.
fn fallback_capture(cli: &Cli, out: &Path) -> Result<()> {
    let mut core = setup::build_core(cli)?;
    headless::run(&mut core, cli.frames, cli.width, cli.height, out)
}
