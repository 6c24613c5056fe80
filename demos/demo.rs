//! Deferred renderer demo: a shadowed sun, colored light volumes, fog,
//! and a transparent forward-pass sphere over an orbiting camera.

use clap::Parser;
use deferred_engine::backend::BackendError;
use deferred_engine::resources::{Material, Mesh};
use deferred_engine::scene::{BoundingSphere, DirectionalLight, PointLight, SpotLight};
use deferred_engine::{window, Engine, RendererConfig, ShadowConfig};
use glam::Vec3;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(about = "Deferred rendering demo")]
struct Args {
    /// Window width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Window height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Disable vsync
    #[arg(long)]
    no_vsync: bool,

    /// Disable cascade anti-flicker stabilization
    #[arg(long)]
    no_anti_flicker: bool,

    /// Shadow map resolution
    #[arg(long, default_value_t = 2048)]
    shadow_map_size: u32,
}

fn build_scene(engine: &mut Engine) -> Result<(), BackendError> {
    // Ground
    engine.add_model(
        Mesh::plane(60.0, 60.0, 8),
        Material::matte(Vec3::new(0.45, 0.45, 0.42)),
    )?;

    // Ring of pillars
    for i in 0..8 {
        let angle = i as f32 / 8.0 * std::f32::consts::TAU;
        let height = 2.0 + (i % 3) as f32;
        let index = engine.add_model(
            Mesh::cube(),
            Material::matte(Vec3::new(0.7, 0.4 + 0.05 * i as f32, 0.3)),
        )?;
        if let Some(model) = engine
            .scene_mut()
            .drawable_mut(index)
            .and_then(|d| d.as_any_mut().downcast_mut::<deferred_engine::scene::Model>())
        {
            model.transform.position = Vec3::new(angle.cos() * 8.0, height * 0.5, angle.sin() * 8.0);
            model.transform.scale = Vec3::new(1.2, height, 1.2);
        }
    }

    // Centerpiece
    let index = engine.add_model(
        Mesh::sphere(1.5, 32, 16),
        Material::shiny(Vec3::new(0.85, 0.85, 0.9)),
    )?;
    if let Some(model) = engine
        .scene_mut()
        .drawable_mut(index)
        .and_then(|d| d.as_any_mut().downcast_mut::<deferred_engine::scene::Model>())
    {
        model.transform.position = Vec3::new(0.0, 1.8, 0.0);
    }

    // A glowing marker
    let index = engine.add_model(
        Mesh::cube(),
        Material::glowing(Vec3::new(0.2, 0.9, 0.4), 0.8),
    )?;
    if let Some(model) = engine
        .scene_mut()
        .drawable_mut(index)
        .and_then(|d| d.as_any_mut().downcast_mut::<deferred_engine::scene::Model>())
    {
        model.transform.position = Vec3::new(-4.0, 0.5, 4.0);
    }

    // Transparent sphere, drawn by the forward pass after composition
    let index = engine.add_model(
        Mesh::sphere(1.0, 24, 12),
        Material::glass(Vec3::new(0.6, 0.8, 1.0), 0.35),
    )?;
    if let Some(model) = engine
        .scene_mut()
        .drawable_mut(index)
        .and_then(|d| d.as_any_mut().downcast_mut::<deferred_engine::scene::Model>())
    {
        model.transform.position = Vec3::new(4.0, 1.0, -4.0);
    }

    let scene = engine.scene_mut();
    scene.volume = BoundingSphere::new(Vec3::ZERO, 40.0);

    scene.lights.add_directional(
        DirectionalLight::new(
            Vec3::new(-0.4, -0.85, -0.3),
            Vec3::new(1.0, 0.96, 0.9),
            Vec3::new(1.0, 1.0, 1.0),
        )
        .with_shadows(),
    );

    let mut warm = PointLight::new(Vec3::new(5.0, 2.5, 5.0), 10.0, Vec3::new(1.0, 0.5, 0.2));
    warm.cast_shadows = true;
    scene.lights.add_point(warm);
    scene.lights.add_point(PointLight::new(
        Vec3::new(-6.0, 2.0, -3.0),
        9.0,
        Vec3::new(0.2, 0.4, 1.0),
    ));

    let mut beam = SpotLight::new(
        Vec3::new(0.0, 9.0, 0.0),
        Vec3::new(0.0, -1.0, 0.1),
        16.0,
        0.5,
        Vec3::new(0.9, 0.9, 0.7),
    );
    beam.cast_shadows = true;
    scene.lights.add_spot(beam);

    scene.lights.fog.enabled = true;
    scene.lights.fog.start = 25.0;
    scene.lights.fog.range = 45.0;
    scene.lights.fog.color = Vec3::new(0.45, 0.5, 0.58);

    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = RendererConfig {
        title: "Deferred Engine Demo".to_string(),
        width: args.width,
        height: args.height,
        vsync: !args.no_vsync,
        shadow: ShadowConfig {
            map_size: args.shadow_map_size,
            anti_flicker: !args.no_anti_flicker,
            ..ShadowConfig::default()
        },
    };

    let start = Instant::now();
    let mut engine: Option<Engine> = None;

    let title = config.title.clone();
    let (width, height) = (config.width, config.height);
    window::run(&title, width, height, move |window| {
        let engine = engine.get_or_insert_with(|| {
            let mut engine = Engine::new(window, &config).expect("engine init");
            build_scene(&mut engine).expect("scene setup");
            engine
        });

        if window.take_resized() {
            let (width, height) = window.dimensions();
            if let Err(err) = engine.resize(width, height) {
                log::error!("resize failed: {err}");
            }
        }

        let t = start.elapsed().as_secs_f32() * 0.25;
        let camera = &mut engine.scene_mut().camera;
        camera.position = Vec3::new(t.cos() * 18.0, 8.0, t.sin() * 18.0);
        camera.look_at(Vec3::new(0.0, 1.5, 0.0));

        match engine.render_frame() {
            Ok(()) => {}
            Err(BackendError::SurfaceLost) => {
                let (width, height) = window.dimensions();
                let _ = engine.resize(width, height);
            }
            Err(err) => log::error!("frame failed: {err}"),
        }
    });
}
