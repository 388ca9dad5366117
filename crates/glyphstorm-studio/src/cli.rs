//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "glyphstorm")]
#[command(about = "Tens of thousands of glyphs swirling around the cursor", long_about = None)]
#[command(version)]
pub struct Cli {
    /// JSON simulation config; missing fields take their defaults
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Particle grid side N (N² particles); overrides the config file
    #[arg(short, long, value_name = "N")]
    pub grid: Option<u32>,

    /// RNG seed for spawn positions and glyphs; overrides the config file
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// TrueType/OpenType font used to rasterize the atlas
    #[arg(long, value_name = "FILE")]
    pub font: Option<PathBuf>,

    /// Restore a glyph assignment saved with --save-glyphs
    #[arg(long, value_name = "FILE")]
    pub glyphs: Option<PathBuf>,

    /// Write the glyph assignment as JSON (also on the S key)
    #[arg(long, value_name = "FILE")]
    pub save_glyphs: Option<PathBuf>,

    /// Render without a window using the software renderer and write a PNG
    #[arg(long, value_name = "PNG")]
    pub headless: Option<PathBuf>,

    /// Simulation ticks to run before a headless capture
    #[arg(long, default_value_t = 120)]
    pub frames: u32,

    /// Window or capture width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Window or capture height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Log filter in env_logger syntax, e.g. "debug" or "glyphstorm_sim=debug"
    #[arg(long, value_name = "FILTER")]
    pub log: Option<String>,
}
