//! Pipeline-level tests against the headless recording backend: pass
//! gating, pass ordering, light-volume skipping, and readiness retries.

use deferred_engine::backend::traits::GraphicsBackend;
use deferred_engine::backend::HeadlessBackend;
use deferred_engine::profiling::PassTrace;
use deferred_engine::resources::{Material, Mesh};
use deferred_engine::scene::{DirectionalLight, Model, PointLight, Scene, SpotLight};
use deferred_engine::{RendererConfig, SceneRenderer};
use glam::Vec3;

fn setup() -> (HeadlessBackend, SceneRenderer, Scene) {
    let mut backend = HeadlessBackend::new(1280, 720);
    let renderer =
        SceneRenderer::new(&mut backend, &RendererConfig::default()).expect("renderer init");
    let mut scene = Scene::new();
    // Camera at origin looking down -Z.
    scene.camera.position = Vec3::new(0.0, 2.0, 0.0);
    scene.camera.target = Vec3::new(0.0, 2.0, -10.0);
    (backend, renderer, scene)
}

fn add_cube_at(
    backend: &mut HeadlessBackend,
    renderer: &SceneRenderer,
    scene: &mut Scene,
    position: Vec3,
) -> usize {
    let mut model = Model::new(Mesh::cube(), Material::matte(Vec3::new(0.6, 0.6, 0.6)));
    model.transform.position = position;
    model.upload(backend, renderer.layouts()).expect("upload");
    scene.add(Box::new(model))
}

fn sun_with_shadows() -> DirectionalLight {
    DirectionalLight::new(Vec3::new(-0.3, -1.0, -0.4), Vec3::ONE, Vec3::ONE).with_shadows()
}

fn render_frame(backend: &mut HeadlessBackend, renderer: &mut SceneRenderer, scene: &Scene) {
    let frame = backend.begin_frame().expect("begin frame");
    renderer.draw(backend, scene, &frame);
    backend.end_frame().expect("end frame");
}

fn render_frame_traced(
    backend: &mut HeadlessBackend,
    renderer: &mut SceneRenderer,
    scene: &Scene,
) -> PassTrace {
    let mut trace = PassTrace::new();
    let frame = backend.begin_frame().expect("begin frame");
    renderer.draw_instrumented(backend, scene, &frame, &mut trace);
    backend.end_frame().expect("end frame");
    trace
}

#[test]
fn empty_scene_issues_no_target_draws() {
    let (mut backend, mut renderer, mut scene) = setup();
    scene.lights.add_directional(sun_with_shadows());

    render_frame(&mut backend, &mut renderer, &scene);

    assert_eq!(backend.draws_into("Shadow"), 0);
    assert_eq!(backend.draws_into("G-Buffer"), 0);
    assert_eq!(backend.draws_into("Light"), 0);
    assert_eq!(backend.draws_into("Stencil"), 0);
    // The frame still completes: the forward pass clears the backbuffer.
    assert_eq!(backend.pass_labels(), vec!["Forward Pass"]);
}

#[test]
fn full_sequence_runs_in_strict_order() {
    let (mut backend, mut renderer, mut scene) = setup();
    scene.lights.add_directional(sun_with_shadows());
    add_cube_at(&mut backend, &renderer, &mut scene, Vec3::new(0.0, 2.0, -8.0));

    let trace = render_frame_traced(&mut backend, &mut renderer, &scene);

    let shadow = trace.position("Shadow Cascade").expect("shadow ran");
    let gbuffer = trace.position("G-Buffer").expect("gbuffer ran");
    let lights = trace.position("Directional Light").expect("lights ran");
    let compose = trace.position("Composition").expect("compose ran");
    let forward = trace.position("Forward").expect("forward ran");

    assert!(shadow < gbuffer);
    assert!(gbuffer < lights);
    assert!(lights < compose);
    // Non-deferred drawables always render after composition.
    assert!(compose < forward);
}

#[test]
fn shadow_draw_requires_a_casting_light() {
    let (mut backend, mut renderer, mut scene) = setup();
    scene
        .lights
        .add_directional(DirectionalLight::new(-Vec3::Y, Vec3::ONE, Vec3::ONE));
    add_cube_at(&mut backend, &renderer, &mut scene, Vec3::new(0.0, 2.0, -8.0));

    render_frame(&mut backend, &mut renderer, &scene);

    assert_eq!(backend.draws_into("Shadow"), 0);
    assert!(backend.draws_into("G-Buffer") > 0);
}

#[test]
fn shadow_draw_requires_opaque_geometry() {
    let (mut backend, mut renderer, mut scene) = setup();
    scene.lights.add_directional(sun_with_shadows());

    // A transparent model takes the forward path and casts nothing.
    let mut model = Model::new(
        Mesh::sphere(1.0, 12, 8),
        Material::glass(Vec3::ONE, 0.4),
    );
    model.transform.position = Vec3::new(0.0, 2.0, -6.0);
    model.upload(&mut backend, renderer.layouts()).expect("upload");
    scene.add(Box::new(model));

    render_frame(&mut backend, &mut renderer, &scene);

    assert_eq!(backend.draws_into("Shadow"), 0);
    assert_eq!(backend.draws_into("G-Buffer"), 0);
    assert_eq!(backend.draws_into("Forward"), 1);
}

#[test]
fn offscreen_light_volume_is_skipped_entirely() {
    let (mut backend, mut renderer, mut scene) = setup();
    add_cube_at(&mut backend, &renderer, &mut scene, Vec3::new(0.0, 2.0, -8.0));

    // One light inside the frustum, one far behind the camera.
    scene
        .lights
        .add_point(PointLight::new(Vec3::new(0.0, 3.0, -7.0), 5.0, Vec3::ONE));
    scene
        .lights
        .add_point(PointLight::new(Vec3::new(0.0, 2.0, 200.0), 5.0, Vec3::ONE));

    render_frame(&mut backend, &mut renderer, &scene);

    // Neither the stencil-marking pass nor the lighting pass ran for the
    // off-screen light.
    let stencil_passes = backend
        .pass_labels()
        .iter()
        .filter(|l| l.contains("Stencil Mark"))
        .count();
    let point_passes = backend
        .pass_labels()
        .iter()
        .filter(|l| l.contains("Point Light"))
        .count();
    assert_eq!(stencil_passes, 1);
    assert_eq!(point_passes, 1);
}

#[test]
fn stencil_is_cleared_for_each_light_volume() {
    let (mut backend, mut renderer, mut scene) = setup();
    add_cube_at(&mut backend, &renderer, &mut scene, Vec3::new(0.0, 2.0, -8.0));

    scene
        .lights
        .add_point(PointLight::new(Vec3::new(1.0, 3.0, -7.0), 5.0, Vec3::ONE));
    scene
        .lights
        .add_spot(SpotLight::new(
            Vec3::new(0.0, 6.0, -8.0),
            -Vec3::Y,
            12.0,
            0.6,
            Vec3::ONE,
        ));

    render_frame(&mut backend, &mut renderer, &scene);

    let mark_passes: Vec<_> = backend
        .recorded_passes()
        .iter()
        .filter(|p| p.label.contains("Stencil Mark"))
        .collect();
    assert_eq!(mark_passes.len(), 2);
    for pass in mark_passes {
        assert!(pass.stencil_cleared, "each mark pass starts from stencil 0");
    }

    // Every mark pass is immediately followed by its lighting pass.
    let labels = backend.pass_labels();
    for (i, label) in labels.iter().enumerate() {
        if label.contains("Stencil Mark") {
            let next = labels.get(i + 1).expect("lighting pass follows");
            assert!(
                next.contains("Point Light") || next.contains("Spot Light"),
                "mark pass followed by {next}"
            );
        }
    }
}

#[test]
fn drawable_behind_camera_is_culled() {
    let (mut backend, mut renderer, mut scene) = setup();
    scene.lights.add_directional(sun_with_shadows());
    add_cube_at(&mut backend, &renderer, &mut scene, Vec3::new(0.0, 2.0, 50.0));

    render_frame(&mut backend, &mut renderer, &scene);

    assert_eq!(backend.draws_into("G-Buffer"), 0);
    assert_eq!(backend.draws_into("Shadow"), 0);
}

#[test]
fn unready_model_is_skipped_then_retried() {
    let (mut backend, mut renderer, mut scene) = setup();

    // Added but never uploaded: the async load has not completed.
    let mut model = Model::new(Mesh::cube(), Material::matte(Vec3::ONE));
    model.transform.position = Vec3::new(0.0, 2.0, -8.0);
    let index = scene.add(Box::new(model));

    render_frame(&mut backend, &mut renderer, &scene);
    assert_eq!(backend.draws_into("G-Buffer"), 0);

    // The upload finishes; the next frame picks the model up.
    let layouts_ready = {
        let model = scene
            .drawable_mut(index)
            .and_then(|d| d.as_any_mut().downcast_mut::<Model>())
            .expect("model");
        model.upload(&mut backend, renderer.layouts()).is_ok()
    };
    assert!(layouts_ready);

    backend.clear_journal();
    render_frame(&mut backend, &mut renderer, &scene);
    assert!(backend.draws_into("G-Buffer") > 0);
}

#[test]
fn culling_switch_disables_frustum_rejection() {
    let (mut backend, mut renderer, mut scene) = setup();
    scene.perform_frustum_culling = false;
    add_cube_at(&mut backend, &renderer, &mut scene, Vec3::new(0.0, 2.0, 50.0));

    render_frame(&mut backend, &mut renderer, &scene);
    assert!(backend.draws_into("G-Buffer") > 0);
}

#[test]
fn resize_recreates_targets_and_keeps_rendering() {
    let (mut backend, mut renderer, mut scene) = setup();
    scene.lights.add_directional(sun_with_shadows());
    add_cube_at(&mut backend, &renderer, &mut scene, Vec3::new(0.0, 2.0, -8.0));

    render_frame(&mut backend, &mut renderer, &scene);

    backend.resize(1920, 1080);
    renderer.resize(&mut backend, 1920, 1080).expect("resize");

    backend.clear_journal();
    render_frame(&mut backend, &mut renderer, &scene);
    assert!(backend.draws_into("G-Buffer") > 0);
    assert!(backend.draws_into("Composition") > 0);
}
