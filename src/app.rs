//! Per-frame application state, independent of any window or GPU.
//!
//! [`AppState`] owns everything the render loop mutates: the model
//! transform, the three key debouncers and the shading selector. The
//! windowed binary samples the keyboard into a [`FrameInput`], calls
//! [`AppState::advance`], then hands the state's matrices to the GPU.

use glam::Mat4;
use winit::keyboard::KeyCode;

use crate::camera::{Camera, Projection};
use crate::input::{Input, KeyToggle};
use crate::shading::{ShadingBackend, ShadingSelector, ShadingVariant};
use crate::transform::{FrameMatrices, ModelTransform};

/// Toggles the debug-normals shading.
pub const TOGGLE_NORMALS_KEY: KeyCode = KeyCode::KeyN;
/// Saves a screenshot.
pub const SCREENSHOT_KEY: KeyCode = KeyCode::F11;
/// Quits the viewer.
pub const EXIT_KEY: KeyCode = KeyCode::Escape;

/// Which bound keys are held this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub toggle_normals: bool,
    pub screenshot: bool,
    pub exit: bool,
}

impl FrameInput {
    /// Samples the bound keys from the current keyboard state.
    pub fn poll(input: &Input) -> Self {
        Self {
            toggle_normals: input.key_down(TOGGLE_NORMALS_KEY),
            screenshot: input.key_down(SCREENSHOT_KEY),
            exit: input.key_down(EXIT_KEY),
        }
    }
}

/// What the caller must do after a frame's state update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameActions {
    /// Set when this frame switched the shading variant.
    pub variant_changed: Option<ShadingVariant>,
    /// Read the framebuffer and save it once this frame is drawn.
    pub capture: bool,
    /// Leave the render loop.
    pub exit: bool,
}

/// Mutable state owned by the render loop.
#[derive(Clone, Debug)]
pub struct AppState {
    transform: ModelTransform,
    view: Mat4,
    projection: Mat4,
    selector: ShadingSelector,
    normals_toggle: KeyToggle,
    screenshot_trigger: KeyToggle,
    exit_trigger: KeyToggle,
}

impl AppState {
    /// View and projection are computed here once and never change.
    pub fn new(
        transform: ModelTransform,
        camera: &Camera,
        projection: &Projection,
        selector: ShadingSelector,
    ) -> Self {
        Self {
            transform,
            view: camera.view_matrix(),
            projection: projection.matrix(),
            selector,
            normals_toggle: KeyToggle::new(),
            screenshot_trigger: KeyToggle::new(),
            exit_trigger: KeyToggle::new(),
        }
    }

    /// Runs one frame of input handling and animation.
    ///
    /// Every debouncer is fed every frame, even when an earlier key already
    /// asked to exit, so none of them misses a release.
    pub fn advance(&mut self, elapsed_secs: f32, held: FrameInput) -> FrameActions {
        let mut actions = FrameActions::default();

        if self.normals_toggle.update(held.toggle_normals) {
            let variant = self.selector.toggle();
            tracing::info!(variant = variant.label(), "shading variant switched");
            actions.variant_changed = Some(variant);
        }
        actions.capture = self.screenshot_trigger.update(held.screenshot);
        actions.exit = self.exit_trigger.update(held.exit);

        self.transform.advance(elapsed_secs);
        actions
    }

    /// Draws the frame with whichever shading variant is active.
    pub fn render<B: ShadingBackend>(
        &self,
        backend: &mut B,
        geometry: &B::Geometry,
        vertex_count: u32,
    ) {
        self.selector
            .render_frame(backend, geometry, &self.matrices(), vertex_count);
    }

    pub fn matrices(&self) -> FrameMatrices {
        FrameMatrices {
            model: self.transform.matrix(),
            view: self.view,
            projection: self.projection,
        }
    }

    pub fn transform(&self) -> &ModelTransform {
        &self.transform
    }

    pub fn active_variant(&self) -> ShadingVariant {
        self.selector.active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::tests::{Call, Recorder, program};
    use crate::shading::ProgramHandle;
    use glam::Vec3;

    fn state() -> AppState {
        AppState::new(
            ModelTransform::new(Vec3::ZERO, 1.0),
            &Camera::default(),
            &Projection::for_size(800, 800),
            ShadingSelector::new(program(1), program(2)),
        )
    }

    fn holding_n() -> FrameInput {
        FrameInput {
            toggle_normals: true,
            ..FrameInput::default()
        }
    }

    #[test]
    fn holding_n_switches_once() {
        let mut state = state();
        let switched: Vec<_> = (0..10)
            .filter_map(|_| state.advance(0.016, holding_n()).variant_changed)
            .collect();
        state.advance(0.016, FrameInput::default());

        assert_eq!(switched, vec![ShadingVariant::DebugNormals]);
        assert_eq!(state.active_variant(), ShadingVariant::DebugNormals);
    }

    #[test]
    fn second_press_switches_back() {
        let mut state = state();
        state.advance(0.016, holding_n());
        state.advance(0.016, FrameInput::default());
        let actions = state.advance(0.016, holding_n());
        assert_eq!(actions.variant_changed, Some(ShadingVariant::Primary));
    }

    #[test]
    fn screenshot_and_exit_are_one_shot() {
        let mut state = state();
        let held = FrameInput {
            screenshot: true,
            exit: true,
            ..FrameInput::default()
        };

        let first = state.advance(0.016, held);
        assert!(first.capture && first.exit);
        assert_eq!(first.variant_changed, None);

        let second = state.advance(0.016, held);
        assert!(!second.capture && !second.exit);
    }

    #[test]
    fn keys_debounce_independently() {
        let mut state = state();
        state.advance(0.016, holding_n());
        let actions = state.advance(
            0.016,
            FrameInput {
                toggle_normals: true,
                screenshot: true,
                exit: false,
            },
        );
        assert!(actions.capture);
        assert_eq!(actions.variant_changed, None);
    }

    #[test]
    fn render_uses_the_active_program() {
        let mut state = state();
        state.advance(0.0, holding_n());

        let mut recorder = Recorder::default();
        state.render(&mut recorder, &"cube", 36);
        assert_eq!(recorder.calls[0], Call::UseProgram(ProgramHandle(2)));
        assert_eq!(recorder.calls.last(), Some(&Call::Draw(36)));
    }

    #[test]
    fn view_and_projection_stay_fixed() {
        let mut state = state();
        let before = state.matrices();
        state.advance(0.016, FrameInput::default());
        let after = state.matrices();

        assert_eq!(before.view, after.view);
        assert_eq!(before.projection, after.projection);
        assert_ne!(before.model, after.model);
    }

    #[test]
    fn frame_input_reads_bound_keys() {
        let mut input = Input::new();
        input.press(KeyCode::F11);
        input.press(KeyCode::KeyM);
        let held = FrameInput::poll(&input);
        assert_eq!(
            held,
            FrameInput {
                toggle_normals: false,
                screenshot: true,
                exit: false,
            }
        );
    }
}
