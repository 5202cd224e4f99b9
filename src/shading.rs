//! Selection between the two shading programs that draw the mesh.
//!
//! Both programs are built up front and share the same geometry buffers.
//! [`ShadingSelector`] only decides which of them receives the frame's
//! matrices and issues the draw; switching never touches GPU state.
//!
//! The GPU side is reached through [`ShadingBackend`], a small command
//! surface (bind program, upload matrix, bind geometry, draw). The wgpu
//! implementation lives in [`crate::mesh_pass`]; tests use a recorder.

use glam::Mat4;

use crate::transform::FrameMatrices;

/// Which shading program draws the mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShadingVariant {
    /// Textured shading.
    #[default]
    Primary,
    /// Surface normals rendered as colour.
    DebugNormals,
}

impl ShadingVariant {
    /// The other variant.
    pub fn toggled(self) -> Self {
        match self {
            ShadingVariant::Primary => ShadingVariant::DebugNormals,
            ShadingVariant::DebugNormals => ShadingVariant::Primary,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShadingVariant::Primary => "primary",
            ShadingVariant::DebugNormals => "debug normals",
        }
    }
}

/// Opaque handle to a compiled shading program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Where a matrix uniform lives inside a program's uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// The model/view/projection uniform locations of one program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatrixUniforms {
    pub model: UniformLocation,
    pub view: UniformLocation,
    pub projection: UniformLocation,
}

/// A compiled program together with its matrix uniform locations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadingProgram {
    pub program: ProgramHandle,
    pub uniforms: MatrixUniforms,
}

/// The GPU commands a frame needs.
///
/// Matrix uploads target the most recently bound program.
pub trait ShadingBackend {
    /// Geometry shared by every program.
    type Geometry: ?Sized;

    fn use_program(&mut self, program: ProgramHandle);
    fn upload_matrix(&mut self, location: UniformLocation, matrix: &Mat4);
    fn bind_geometry(&mut self, geometry: &Self::Geometry);
    /// Draws `vertex_count` vertices as a triangle list.
    fn draw_triangles(&mut self, vertex_count: u32);
}

/// Holds both shading programs and drives whichever is active.
#[derive(Clone, Debug)]
pub struct ShadingSelector {
    primary: ShadingProgram,
    debug_normals: ShadingProgram,
    active: ShadingVariant,
}

impl ShadingSelector {
    /// Both programs must already be compiled; `Primary` starts active.
    pub fn new(primary: ShadingProgram, debug_normals: ShadingProgram) -> Self {
        Self {
            primary,
            debug_normals,
            active: ShadingVariant::Primary,
        }
    }

    /// Makes `variant` the one that draws. Idempotent.
    pub fn activate(&mut self, variant: ShadingVariant) {
        self.active = variant;
    }

    /// Switches to the other variant and returns it.
    pub fn toggle(&mut self) -> ShadingVariant {
        self.active = self.active.toggled();
        self.active
    }

    pub fn active(&self) -> ShadingVariant {
        self.active
    }

    pub fn program(&self, variant: ShadingVariant) -> &ShadingProgram {
        match variant {
            ShadingVariant::Primary => &self.primary,
            ShadingVariant::DebugNormals => &self.debug_normals,
        }
    }

    /// Draws one frame with the active program.
    ///
    /// Leaves the active program and the geometry bound on the backend.
    pub fn render_frame<B: ShadingBackend>(
        &self,
        backend: &mut B,
        geometry: &B::Geometry,
        matrices: &FrameMatrices,
        vertex_count: u32,
    ) {
        let ShadingProgram { program, uniforms } = *self.program(self.active);

        backend.use_program(program);
        backend.upload_matrix(uniforms.model, &matrices.model);
        backend.upload_matrix(uniforms.view, &matrices.view);
        backend.upload_matrix(uniforms.projection, &matrices.projection);
        backend.bind_geometry(geometry);
        backend.draw_triangles(vertex_count);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use glam::Vec3;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Call {
        UseProgram(ProgramHandle),
        Upload(UniformLocation, Mat4),
        BindGeometry(&'static str),
        Draw(u32),
    }

    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) calls: Vec<Call>,
    }

    impl ShadingBackend for Recorder {
        type Geometry = &'static str;

        fn use_program(&mut self, program: ProgramHandle) {
            self.calls.push(Call::UseProgram(program));
        }

        fn upload_matrix(&mut self, location: UniformLocation, matrix: &Mat4) {
            self.calls.push(Call::Upload(location, *matrix));
        }

        fn bind_geometry(&mut self, geometry: &&'static str) {
            self.calls.push(Call::BindGeometry(*geometry));
        }

        fn draw_triangles(&mut self, vertex_count: u32) {
            self.calls.push(Call::Draw(vertex_count));
        }
    }

    pub(crate) fn program(id: u32) -> ShadingProgram {
        ShadingProgram {
            program: ProgramHandle(id),
            uniforms: MatrixUniforms {
                model: UniformLocation(id * 10),
                view: UniformLocation(id * 10 + 1),
                projection: UniformLocation(id * 10 + 2),
            },
        }
    }

    fn matrices() -> FrameMatrices {
        FrameMatrices {
            model: Mat4::from_translation(Vec3::X),
            view: Mat4::from_translation(Vec3::Y),
            projection: Mat4::from_translation(Vec3::Z),
        }
    }

    #[test]
    fn debug_normals_draws_with_its_own_program() {
        let mut selector = ShadingSelector::new(program(1), program(2));
        selector.activate(ShadingVariant::DebugNormals);

        let mut recorder = Recorder::default();
        let m = matrices();
        selector.render_frame(&mut recorder, &"cube", &m, 36);

        assert_eq!(
            recorder.calls,
            vec![
                Call::UseProgram(ProgramHandle(2)),
                Call::Upload(UniformLocation(20), m.model),
                Call::Upload(UniformLocation(21), m.view),
                Call::Upload(UniformLocation(22), m.projection),
                Call::BindGeometry("cube"),
                Call::Draw(36),
            ]
        );
    }

    #[test]
    fn primary_is_active_by_default() {
        let selector = ShadingSelector::new(program(1), program(2));
        let mut recorder = Recorder::default();
        selector.render_frame(&mut recorder, &"cube", &matrices(), 3);

        assert_eq!(recorder.calls[0], Call::UseProgram(ProgramHandle(1)));
        assert!(
            !recorder
                .calls
                .iter()
                .any(|call| *call == Call::UseProgram(ProgramHandle(2)))
        );
    }

    #[test]
    fn activate_is_idempotent_and_toggle_flips() {
        let mut selector = ShadingSelector::new(program(1), program(2));
        selector.activate(ShadingVariant::DebugNormals);
        selector.activate(ShadingVariant::DebugNormals);
        assert_eq!(selector.active(), ShadingVariant::DebugNormals);

        assert_eq!(selector.toggle(), ShadingVariant::Primary);
        assert_eq!(selector.toggle(), ShadingVariant::DebugNormals);
    }

    #[test]
    fn both_variants_share_geometry() {
        let mut selector = ShadingSelector::new(program(1), program(2));
        let mut recorder = Recorder::default();

        selector.render_frame(&mut recorder, &"mesh", &matrices(), 6);
        selector.toggle();
        selector.render_frame(&mut recorder, &"mesh", &matrices(), 6);

        let bound = recorder
            .calls
            .iter()
            .filter(|call| **call == Call::BindGeometry("mesh"))
            .count();
        assert_eq!(bound, 2);
    }
}
