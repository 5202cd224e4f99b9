//! Whole-frame scenarios driven through the public API with a recording backend.

use meshview::{
    AppState, Camera, FrameInput, Mat4, MatrixUniforms, MeshData, ModelTransform, ProgramHandle,
    Projection, ShadingBackend, ShadingProgram, ShadingSelector, ShadingVariant, UniformLocation,
    Vec3,
};

#[derive(Default)]
struct DrawLog {
    programs: Vec<ProgramHandle>,
    uploads: Vec<(UniformLocation, Mat4)>,
    draws: Vec<u32>,
}

impl ShadingBackend for DrawLog {
    type Geometry = MeshData;

    fn use_program(&mut self, program: ProgramHandle) {
        self.programs.push(program);
    }

    fn upload_matrix(&mut self, location: UniformLocation, matrix: &Mat4) {
        self.uploads.push((location, *matrix));
    }

    fn bind_geometry(&mut self, _geometry: &MeshData) {}

    fn draw_triangles(&mut self, vertex_count: u32) {
        self.draws.push(vertex_count);
    }
}

fn program(id: u32) -> ShadingProgram {
    ShadingProgram {
        program: ProgramHandle(id),
        uniforms: MatrixUniforms {
            model: UniformLocation(0),
            view: UniformLocation(64),
            projection: UniformLocation(128),
        },
    }
}

fn app(translation: Vec3, scale: f32) -> AppState {
    AppState::new(
        ModelTransform::new(translation, scale),
        &Camera::default(),
        &Projection::for_size(800, 800),
        ShadingSelector::new(program(1), program(2)),
    )
}

#[test]
fn three_frames_of_scaled_translated_cube() {
    let cube = MeshData::cube();
    assert_eq!(cube.vertex_count(), 36);

    let mut state = app(Vec3::new(1.0, 0.0, 0.0), 2.0);
    for _ in 0..3 {
        state.advance(0.016, FrameInput::default());
    }

    // Each step adds sin(0.016 * 50) degrees.
    let angle = 3.0 * 0.8f32.sin();
    assert!((state.transform().rotation_degrees() - angle).abs() < 1e-5);
    assert!((angle - 2.152_068_3).abs() < 1e-5);

    let (s, c) = angle.to_radians().sin_cos();
    let expected = Mat4::from_cols_array(&[
        2.0 * c, 0.0, -2.0 * s, 0.0, //
        0.0, 2.0, 0.0, 0.0, //
        2.0 * s, 0.0, 2.0 * c, 0.0, //
        1.0, 0.0, 0.0, 1.0,
    ]);

    let mut log = DrawLog::default();
    state.render(&mut log, &cube, cube.vertex_count() as u32);

    assert_eq!(log.draws, vec![36]);
    let (location, model) = log.uploads[0];
    assert_eq!(location, UniformLocation(0));
    assert!(
        model.abs_diff_eq(expected, 1e-5),
        "model {model:?} != {expected:?}"
    );
}

#[test]
fn holding_n_for_ten_frames_toggles_once() {
    let mut state = app(Vec3::ZERO, 1.0);
    let held = FrameInput {
        toggle_normals: true,
        ..FrameInput::default()
    };

    let switches = (0..10)
        .filter(|_| state.advance(0.016, held).variant_changed.is_some())
        .count();
    state.advance(0.016, FrameInput::default());

    assert_eq!(switches, 1);
    assert_eq!(state.active_variant(), ShadingVariant::DebugNormals);

    let cube = MeshData::cube();
    let mut log = DrawLog::default();
    state.render(&mut log, &cube, 36);
    assert_eq!(log.programs, vec![ProgramHandle(2)]);
}

#[test]
fn stalled_clock_does_not_spin() {
    let mut state = app(Vec3::ZERO, 1.0);
    state.advance(0.016, FrameInput::default());
    let before = state.transform().rotation_degrees();

    for elapsed in [0.0, -0.5, f32::NAN] {
        state.advance(elapsed, FrameInput::default());
    }
    assert_eq!(state.transform().rotation_degrees(), before);
}
