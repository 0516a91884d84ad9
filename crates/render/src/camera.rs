use crate::error::GfxError;
use crate::shader::{Program, UniformWrite};
use glam::{Mat4, Vec2, Vec3};
use lumen_assets::CameraConfig;
use lumen_input::{Action, CursorControl, CursorMode, InputState, KeyBindings};

/// Pitch stays strictly inside ±90° so the view never flips over the pole.
pub const PITCH_LIMIT_DEGREES: f32 = 89.0;

/// First-person fly camera driven by keyboard movement and mouse-look.
///
/// Orientation is yaw/pitch in degrees; yaw 270° looks down -Z and yaw is
/// always kept in `[0, 360)`. Mouse-look
/// measures cursor displacement from the viewport centre and warps the
/// cursor back to the centre after every sample.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    pub sprint_multiplier: f32,
    pub sensitivity: f32,
    width: u32,
    height: u32,
    captured: bool,
    first_click: bool,
}

impl FlyCamera {
    /// Camera at `position` looking down -Z, with default tuning.
    pub fn new(width: u32, height: u32, position: Vec3) -> Self {
        let config = CameraConfig {
            position,
            ..CameraConfig::default()
        };
        Self::from_config(&config, width, height)
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self {
            position: config.position,
            yaw: 270.0,
            pitch: 0.0,
            fov: config.fov_degrees,
            near: config.near,
            far: config.far,
            speed: config.speed,
            sprint_multiplier: config.sprint_multiplier,
            sensitivity: config.sensitivity,
            width: width.max(1),
            height: height.max(1),
            captured: false,
            first_click: true,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize()
    }

    /// Update the viewport after a resize. Zero sizes are clamped to 1.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn viewport_center(&self) -> Vec2 {
        Vec2::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    /// Whether mouse-look currently holds the cursor.
    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Rotate by a cursor displacement in pixels.
    ///
    /// A sweep across the whole viewport turns by `sensitivity` degrees.
    /// Non-finite deltas are ignored.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let yaw_delta = self.sensitivity * dx / self.width as f32;
        let pitch_delta = self.sensitivity * dy / self.height as f32;
        if !yaw_delta.is_finite() || !pitch_delta.is_finite() {
            tracing::debug!(dx, dy, "ignoring non-finite cursor delta");
            return;
        }
        self.yaw = (self.yaw + yaw_delta).rem_euclid(360.0);
        self.pitch = (self.pitch - pitch_delta).clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES);
    }

    /// Consume one frame of input: mouse-look first, then movement.
    pub fn process_input(
        &mut self,
        input: &mut InputState,
        cursor: &mut dyn CursorControl,
        bindings: &KeyBindings,
        dt: f32,
    ) {
        self.look(input, cursor, bindings);
        self.translate(input, bindings, dt);
    }

    fn look(
        &mut self,
        input: &mut InputState,
        cursor: &mut dyn CursorControl,
        bindings: &KeyBindings,
    ) {
        if !bindings.is_active(Action::Look, input) {
            if self.captured {
                cursor.set_mode(CursorMode::Normal);
                self.captured = false;
                self.first_click = true;
                tracing::debug!("mouse-look released");
            }
            return;
        }

        if !self.captured {
            cursor.set_mode(CursorMode::Captured);
            self.captured = true;
            tracing::debug!("mouse-look captured");
        }

        let center = self.viewport_center();
        if self.first_click {
            // The reported position predates the capture; measure from the centre.
            self.first_click = false;
        } else {
            let delta = input.cursor_position() - center;
            self.rotate(delta.x, delta.y);
        }
        cursor.warp(center);
        input.cursor_warped(center);
    }

    fn translate(&mut self, input: &InputState, bindings: &KeyBindings, dt: f32) {
        let held = |action| bindings.is_active(action, input);
        let forward = self.forward();
        let right = self.right();

        let mut step = Vec3::ZERO;
        if held(Action::MoveForward) {
            step += forward;
        }
        if held(Action::MoveBackward) {
            step -= forward;
        }
        if held(Action::StrafeRight) {
            step += right;
        }
        if held(Action::StrafeLeft) {
            step -= right;
        }
        if held(Action::Ascend) {
            step += Vec3::Y;
        }
        if held(Action::Descend) {
            step -= Vec3::Y;
        }

        let mut speed = self.speed * dt;
        if held(Action::Sprint) {
            speed *= self.sprint_multiplier;
        }
        self.position += step * speed;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    /// `projection * view` for the given lens, using the viewport aspect.
    pub fn compute_view_projection(&self, fov_degrees: f32, near: f32, far: f32) -> Mat4 {
        let projection = Mat4::perspective_rh(fov_degrees.to_radians(), self.aspect(), near, far);
        projection * self.view_matrix()
    }

    /// View-projection with the camera's configured lens.
    pub fn view_projection(&self) -> Mat4 {
        self.compute_view_projection(self.fov, self.near, self.far)
    }

    /// Compute the view-projection and write it to `uniform` on `program`.
    pub fn upload_matrix(
        &self,
        program: &Program,
        fov_degrees: f32,
        near: f32,
        far: f32,
        uniform: &str,
    ) -> Result<UniformWrite, GfxError> {
        program.set_mat4(uniform, self.compute_view_projection(fov_degrees, near, far))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::share;
    use crate::recording::{Call, RecordingContext};
    use crate::uniforms::CAMERA_MATRIX;
    use lumen_common::UniformValue;
    use lumen_input::{Key, MouseButton, VirtualCursor};

    fn camera() -> FlyCamera {
        FlyCamera::new(800, 600, Vec3::new(0.0, 1.0, 4.0))
    }

    /// Hold the look button and run one frame with the cursor at `at`.
    fn look_frame(
        cam: &mut FlyCamera,
        input: &mut InputState,
        cursor: &mut VirtualCursor,
        at: Vec2,
    ) {
        input.set_button(MouseButton::Left, true);
        input.set_cursor_position(at);
        cam.process_input(input, cursor, &KeyBindings::default(), 0.0);
    }

    #[test]
    fn starts_facing_negative_z() {
        let cam = camera();
        assert!(cam.forward().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(cam.up().abs_diff_eq(Vec3::Y, 1e-6));
        assert!(cam.right().abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn yaw_stays_wrapped() {
        let mut cam = camera();
        assert!((0.0..360.0).contains(&cam.yaw));
        let start = cam.yaw;
        cam.rotate(0.0, 0.0);
        assert_eq!(cam.yaw, start);

        // 100 degrees per viewport width: 720 px is a quarter turn.
        cam.rotate(720.0, 0.0);
        assert_eq!(cam.yaw, 0.0);
        cam.rotate(-1440.0, 0.0);
        assert_eq!(cam.yaw, 180.0);
        assert!(cam.forward().abs_diff_eq(Vec3::NEG_X, 1e-6));
    }

    #[test]
    fn view_projection_is_deterministic() {
        let cam = camera();
        let a = cam.compute_view_projection(45.0, 0.1, 100.0);
        let b = cam.compute_view_projection(45.0, 0.1, 100.0);
        assert_eq!(a, b);
        assert!(a.to_cols_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn point_ahead_projects_to_screen_centre() {
        let cam = camera();
        let vp = cam.compute_view_projection(45.0, 0.1, 100.0);
        let clip = vp * glam::Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(clip.w > 0.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn aspect_follows_viewport() {
        let mut cam = camera();
        let before = cam.compute_view_projection(45.0, 0.1, 100.0);
        cam.set_viewport(1600, 600);
        assert_eq!(cam.aspect(), 1600.0 / 600.0);
        assert_ne!(cam.compute_view_projection(45.0, 0.1, 100.0), before);
        cam.set_viewport(0, 0);
        assert_eq!(cam.viewport(), (1, 1));
    }

    #[test]
    fn pitch_never_reaches_ninety() {
        let mut cam = camera();
        let mut input = InputState::new();
        let mut cursor = VirtualCursor::new();
        let center = cam.viewport_center();

        let pushes = [-1.0e6, 5.0e4, -3.0, 1.0e9, f32::MAX, -f32::MAX, 0.5, -1.0e7];
        for (i, dy) in pushes.iter().cycle().take(64).enumerate() {
            let dx = if i % 2 == 0 { 250.0 } else { -1.0e5 };
            look_frame(&mut cam, &mut input, &mut cursor, center + Vec2::new(dx, *dy));
            assert!(cam.pitch > -90.0 && cam.pitch < 90.0, "pitch {}", cam.pitch);
            assert!(cam.yaw.is_finite());
        }
        let fwd = cam.forward();
        assert!(fwd.is_finite() && fwd.cross(Vec3::Y).length() > 0.0);
    }

    #[test]
    fn first_capture_recentres_without_rotating() {
        let mut cam = camera();
        let mut input = InputState::new();
        let mut cursor = VirtualCursor::new();
        let (yaw, pitch) = (cam.yaw, cam.pitch);

        // Cursor far from centre when the button goes down.
        look_frame(&mut cam, &mut input, &mut cursor, Vec2::new(790.0, 10.0));
        assert_eq!((cam.yaw, cam.pitch), (yaw, pitch));
        assert_eq!(cursor.mode, CursorMode::Captured);
        assert_eq!(cursor.last_warp(), Some(cam.viewport_center()));
        assert_eq!(input.cursor_position(), cam.viewport_center());

        // No motion since the warp: still no rotation.
        cam.process_input(&mut input, &mut cursor, &KeyBindings::default(), 0.0);
        assert_eq!((cam.yaw, cam.pitch), (yaw, pitch));

        // Small motion: small rotation.
        let nudged = cam.viewport_center() + Vec2::new(8.0, 0.0);
        look_frame(&mut cam, &mut input, &mut cursor, nudged);
        assert!(((cam.yaw - yaw).rem_euclid(360.0) - 1.0).abs() < 1e-3);
        assert_eq!(cam.pitch, pitch);
    }

    #[test]
    fn release_then_recapture_does_not_jump() {
        let mut cam = camera();
        let mut input = InputState::new();
        let mut cursor = VirtualCursor::new();
        let center = cam.viewport_center();

        look_frame(&mut cam, &mut input, &mut cursor, center);
        look_frame(&mut cam, &mut input, &mut cursor, center + Vec2::new(40.0, 30.0));
        let (yaw, pitch) = (cam.yaw, cam.pitch);

        input.set_button(MouseButton::Left, false);
        cam.process_input(&mut input, &mut cursor, &KeyBindings::default(), 0.0);
        assert_eq!(cursor.mode, CursorMode::Normal);
        assert!(!cam.is_captured());

        // The user wanders off to a corner, then grabs again.
        look_frame(&mut cam, &mut input, &mut cursor, Vec2::new(0.0, 0.0));
        assert_eq!((cam.yaw, cam.pitch), (yaw, pitch));
    }

    #[test]
    fn movement_follows_basis_and_sprint() {
        let mut cam = camera();
        let mut input = InputState::new();
        let mut cursor = VirtualCursor::new();
        let bindings = KeyBindings::default();
        let start = cam.position;

        input.set_key(Key::W, true);
        cam.process_input(&mut input, &mut cursor, &bindings, 0.5);
        let walked = cam.position - start;
        assert!(walked.abs_diff_eq(Vec3::NEG_Z * cam.speed * 0.5, 1e-4));

        let before = cam.position;
        input.set_key(Key::LeftShift, true);
        cam.process_input(&mut input, &mut cursor, &bindings, 0.5);
        let sprinted = cam.position - before;
        assert!((sprinted.length() - walked.length() * cam.sprint_multiplier).abs() < 1e-3);
    }

    #[test]
    fn ascend_and_strafe() {
        let mut cam = camera();
        let mut input = InputState::new();
        let mut cursor = VirtualCursor::new();
        let start = cam.position;

        input.set_key(Key::Space, true);
        input.set_key(Key::D, true);
        cam.process_input(&mut input, &mut cursor, &KeyBindings::default(), 1.0);
        let moved = cam.position - start;
        assert!(moved.abs_diff_eq(Vec3::new(cam.speed, cam.speed, 0.0), 1e-4));
    }

    #[test]
    fn upload_writes_camera_matrix() {
        let (rec, ctx) = share(RecordingContext::new());
        let program = Program::link(&ctx, &[]).unwrap();
        let cam = camera();
        let write = cam.upload_matrix(&program, 45.0, 0.1, 100.0, CAMERA_MATRIX);
        assert!(matches!(write, Ok(UniformWrite::Written(_))));

        let expected = cam.compute_view_projection(45.0, 0.1, 100.0);
        assert!(rec.borrow().calls().contains(&Call::SetUniform {
            program: program.id(),
            name: CAMERA_MATRIX.into(),
            value: UniformValue::Mat4(expected),
        }));
    }
}
