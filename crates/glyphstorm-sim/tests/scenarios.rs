use glam::{Vec2, Vec3, Vec4};
use glyphstorm_sim::{
    AtlasConfig, BlockGlyphs, ExecutionMode, FontGlyphs, ForceFieldConfig, ForceIntegrator, GlyphAssignment,
    GlyphAtlas, ParticleCore, SimError, SimulationConfig, StateStore, TickInput,
};

fn quiet() -> ForceFieldConfig {
    ForceFieldConfig {
        attraction_strength: 0.0,
        flow_scale: 0.0,
        ..Default::default()
    }
}

#[test]
fn four_particles_at_origin_all_head_for_the_attractor() {
    let forces = ForceFieldConfig {
        attractor_scale: 10.0,
        damping: 1.0,
        flow_scale: 0.0,
        ..Default::default()
    };
    let integrator = ForceIntegrator::new(forces, ExecutionMode::Parallel).unwrap();

    let mut store = StateStore::new();
    store.initialize(2, |_| Vec3::ZERO).unwrap();
    // Cursor at the right edge puts the attractor at (10, 0, 0).
    store.step(&integrator, &TickInput::new(Vec2::new(1.0, 0.0), false, 0.0)).unwrap();

    let v = store.current_velocity().unwrap();
    assert_eq!(v.len(), 4);
    for vel in v {
        assert_eq!(*vel, v[0]);
        assert!(vel.x > 0.0);
        assert_eq!(vel.y, 0.0);
        assert_eq!(vel.z, 0.0);
    }
}

#[test]
fn particle_outside_the_boundary_is_pushed_back() {
    let forces = ForceFieldConfig { boundary_radius: 5.0, return_strength: 0.5, ..quiet() };
    let integrator = ForceIntegrator::new(forces, ExecutionMode::Serial).unwrap();

    let mut store = StateStore::new();
    store.initialize(1, |_| Vec3::new(10.0, 0.0, 0.0)).unwrap();
    store.step(&integrator, &TickInput::default()).unwrap();

    let v = store.current_velocity().unwrap()[0];
    assert!(v.x < 0.0);
    assert!((v.x.abs() - 0.5).abs() < 1e-6);
    assert_eq!(store.current_position().unwrap()[0], Vec4::new(10.0, 0.0, 0.0, 1.0));
}

#[test]
fn damping_shrinks_every_velocity_by_the_same_factor() {
    let forces = ForceFieldConfig { damping: 0.9, ..quiet() };
    let integrator = ForceIntegrator::new(forces, ExecutionMode::Parallel).unwrap();

    let mut store = StateStore::new();
    store.initialize(16, |i| Vec3::new(i as f32 * 0.1, 0.0, 0.0)).unwrap();

    // Give everything a velocity with a first, undamped kick from the boundary-free state.
    let kick = ForceIntegrator::new(
        ForceFieldConfig { attraction_strength: 50.0, damping: 1.0, flow_scale: 0.0, ..Default::default() },
        ExecutionMode::Parallel,
    )
    .unwrap();
    store.step(&kick, &TickInput::new(Vec2::new(0.3, 0.7), false, 0.0)).unwrap();
    let before: Vec<f32> = store.current_velocity().unwrap().iter().map(|v| v.length()).collect();

    store.step(&integrator, &TickInput::default()).unwrap();
    let after = store.current_velocity().unwrap();
    for (b, a) in before.iter().zip(after) {
        assert!((a.length() - b * 0.9).abs() < 1e-5);
        assert!(a.length() < *b || *b == 0.0);
    }
}

#[test]
fn two_glyph_atlas_uvs() {
    let cfg = AtlasConfig {
        charset: "AB".into(),
        cols: 2,
        rows: 1,
        ..Default::default()
    };
    let atlas = GlyphAtlas::build(&cfg, &BlockGlyphs).unwrap();
    assert_eq!(atlas.cell_uv(0), Some(Vec2::ZERO));
    assert_eq!(atlas.cell_uv(1), Some(Vec2::new(0.5, 0.0)));
}

#[test]
fn serial_and_parallel_runs_are_bit_identical() {
    let base = SimulationConfig {
        grid_side: 24,
        seed: Some(0xC0FFEE),
        atlas: AtlasConfig { cell_px: 8, glyph_px: 6.0, ..Default::default() },
        ..Default::default()
    };

    let mut serial = ParticleCore::new();
    serial
        .initialize(SimulationConfig { execution: ExecutionMode::Serial, ..base.clone() }, &BlockGlyphs)
        .unwrap();
    let mut parallel = ParticleCore::new();
    parallel
        .initialize(SimulationConfig { execution: ExecutionMode::Parallel, ..base }, &BlockGlyphs)
        .unwrap();

    for tick in 0..30 {
        let t = tick as f32 / 60.0;
        let input = TickInput::new(Vec2::new(t.sin(), t.cos() * 0.5), tick % 7 == 0, t);
        serial.step(input).unwrap();
        parallel.step(input).unwrap();
    }

    let a = serial.frame().unwrap();
    let b = parallel.frame().unwrap();
    let bits = |s: &[Vec4]| s.iter().flat_map(|v| v.to_array().map(f32::to_bits)).collect::<Vec<_>>();
    assert_eq!(bits(a.positions), bits(b.positions));
    assert_eq!(bits(a.velocities), bits(b.velocities));
}

#[test]
fn saved_glyph_assignment_survives_a_restart() {
    let cfg = SimulationConfig {
        grid_side: 8,
        seed: Some(5),
        atlas: AtlasConfig { cell_px: 8, glyph_px: 6.0, ..Default::default() },
        ..Default::default()
    };

    let mut first = ParticleCore::new();
    first.initialize(cfg.clone(), &BlockGlyphs).unwrap();
    let json = first.bindings().unwrap().assignment().to_json().unwrap();

    let mut second = ParticleCore::new();
    let restored = GlyphAssignment::from_json(&json).unwrap();
    second
        .initialize_with_assignment(SimulationConfig { seed: Some(99), ..cfg }, &BlockGlyphs, restored)
        .unwrap();

    let a = first.frame().unwrap();
    let b = second.frame().unwrap();
    for ((ra, ga), (rb, gb)) in a.bindings.iter().zip(b.bindings.iter()) {
        assert_eq!(ra, rb);
        assert_eq!(a.atlas.cell_uv(ga), b.atlas.cell_uv(gb));
    }
}

#[test]
fn oversized_glyphs_fail_initialization_cleanly() {
    let cfg = SimulationConfig {
        grid_side: 2,
        seed: Some(1),
        atlas: AtlasConfig { glyph_px: 70_000.0, ..Default::default() },
        ..Default::default()
    };
    assert!(matches!(cfg.validate(), Err(SimError::Configuration(_))));

    let mut core = ParticleCore::new();
    assert!(matches!(core.initialize(cfg, &BlockGlyphs), Err(SimError::Configuration(_))));
    assert!(!core.is_running());
}

#[test]
fn font_atlas_inks_every_visible_glyph_cell() {
    let font = FontGlyphs::from_bytes(include_bytes!("fonts/DejaVuSansMono.ttf")).unwrap();
    let cfg = AtlasConfig { charset: "Ag#".into(), cols: 3, rows: 1, cell_px: 32, glyph_px: 24.0 };
    let atlas = GlyphAtlas::build(&cfg, &font).unwrap();

    assert_eq!(atlas.image().dimensions(), (96, 32));
    for col in 0..3 {
        let inked = (0..32).any(|y| (col * 32..col * 32 + 32).any(|x| atlas.image().get_pixel(x, y).0[0] > 0));
        assert!(inked, "cell {col} is blank");
    }
}
