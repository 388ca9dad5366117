//! Turns CLI arguments into a running particle core.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glyphstorm_sim::{BlockGlyphs, FontGlyphs, GlyphAssignment, GlyphSource, ParticleCore, SimulationConfig};

use crate::cli::Cli;

/// Fonts tried when `--font` is not given.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Reads the config file (if any) and applies CLI overrides.
pub fn load_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            SimulationConfig::from_json(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };

    if let Some(grid) = cli.grid {
        config.grid_side = grid;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

/// Picks the glyph rasterizer: `--font`, then a known system font, then
/// the procedural block glyphs.
pub fn glyph_source(font: Option<&Path>) -> Result<Box<dyn GlyphSource>> {
    if let Some(path) = font {
        let bytes = fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
        let glyphs = FontGlyphs::from_bytes(&bytes)
            .with_context(|| format!("failed to parse font {}", path.display()))?;
        log::info!("rasterizing glyphs from {}", path.display());
        return Ok(Box::new(glyphs));
    }

    for path in SYSTEM_FONTS {
        let Ok(bytes) = fs::read(path) else { continue };
        match FontGlyphs::from_bytes(&bytes) {
            Ok(glyphs) => {
                log::info!("rasterizing glyphs from {path}");
                return Ok(Box::new(glyphs));
            }
            Err(e) => log::debug!("skipping {path}: {e}"),
        }
    }

    log::warn!("no usable font found, falling back to block glyphs (use --font)");
    Ok(Box::new(BlockGlyphs))
}

/// Builds and initializes the core described by `cli`.
pub fn build_core(cli: &Cli) -> Result<ParticleCore> {
    let config = load_config(cli)?;
    let glyphs = glyph_source(cli.font.as_deref())?;

    let mut core = ParticleCore::new();
    match &cli.glyphs {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read glyph assignment {}", path.display()))?;
            let assignment = GlyphAssignment::from_json(&text)
                .with_context(|| format!("invalid glyph assignment {}", path.display()))?;
            core.initialize_with_assignment(config, glyphs.as_ref(), assignment)
                .context("failed to initialize particle core")?;
            log::info!("restored glyph assignment from {}", path.display());
        }
        None => core
            .initialize(config, glyphs.as_ref())
            .context("failed to initialize particle core")?,
    }

    if let Some(path) = &cli.save_glyphs {
        save_glyphs(&core, path)?;
    }
    Ok(core)
}

/// Writes the core's current glyph assignment as JSON.
pub fn save_glyphs(core: &ParticleCore, path: &Path) -> Result<()> {
    let json = core.bindings()?.assignment().to_json()?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("glyph assignment saved to {}", path.display());
    Ok(())
}

/// Where the S key saves glyphs when `--save-glyphs` was not given.
pub fn default_glyphs_path() -> PathBuf {
    PathBuf::from("glyphs.json")
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("glyphstorm-setup-{}-{name}", std::process::id()))
    }

    #[test]
    fn cli_overrides_config_file() {
        let path = scratch("config.json");
        fs::write(&path, r#"{ "grid_side": 64, "seed": 3, "forces": { "damping": 0.5 } }"#).unwrap();

        let cli = Cli::try_parse_from(["glyphstorm", "--config", path.to_str().unwrap(), "--grid", "8"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.grid_side, 8);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.forces.damping, 0.5);
        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["glyphstorm", "--config", "/definitely/not/here.json"]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn unreadable_font_is_an_error() {
        assert!(glyph_source(Some(Path::new("/definitely/not/a/font.ttf"))).is_err());
    }

    #[test]
    fn saved_glyphs_restore_the_same_assignment() {
        let path = scratch("glyphs.json");
        let path_arg = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["glyphstorm", "-g", "6", "-s", "21", "--save-glyphs", path_arg]).unwrap();
        let first = build_core(&cli).unwrap();

        let cli = Cli::try_parse_from(["glyphstorm", "-g", "6", "-s", "22", "--glyphs", path_arg]).unwrap();
        let second = build_core(&cli).unwrap();

        assert_eq!(
            first.bindings().unwrap().assignment(),
            second.bindings().unwrap().assignment()
        );
        fs::remove_file(path).ok();
    }

    #[test]
    fn restored_glyphs_must_match_the_grid() {
        let path = scratch("mismatch.json");
        let path_arg = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["glyphstorm", "-g", "4", "-s", "1", "--save-glyphs", path_arg]).unwrap();
        build_core(&cli).unwrap();

        let cli = Cli::try_parse_from(["glyphstorm", "-g", "5", "--glyphs", path_arg]).unwrap();
        assert!(build_core(&cli).is_err());
        fs::remove_file(path).ok();
    }
}
