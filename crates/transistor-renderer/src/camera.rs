//! Orbit camera for the device view

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};

/// Closest and farthest orbit distance
pub const MIN_DISTANCE: f32 = 5.0;
pub const MAX_DISTANCE: f32 = 15.0;

/// Pitch limits. The lower bound lets the camera dip 0.2 rad below the
/// horizon; the upper bound stops just short of looking straight down.
pub const MIN_PITCH: f32 = -0.2;
pub const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Camera uniform for GPU
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _padding: f32,
}

/// Orbits `target` at `distance`, steered by yaw and pitch
pub struct Camera {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub target: Vec3,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    reset: Option<(f32, f32, f32)>,
}

impl Camera {
    /// Starts at (0, 2, 8) looking at the origin
    pub fn new(width: u32, height: u32) -> Self {
        let (yaw, pitch, distance) = Self::home();

        Self {
            distance,
            yaw,
            pitch,
            target: Vec3::ZERO,
            aspect: width as f32 / height.max(1) as f32,
            fovy: 50.0_f32.to_radians(),
            znear: 0.1,
            zfar: 100.0,
            reset: None,
        }
    }

    fn home() -> (f32, f32, f32) {
        let home = Vec3::new(0.0, 2.0, 8.0);
        (0.0, home.y.atan2(home.z), home.length())
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(-self.pitch)
    }

    pub fn position(&self) -> Vec3 {
        let offset = self.rotation() * Vec3::new(0.0, 0.0, self.distance);
        self.target + offset
    }

    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        self.reset = None;
        self.yaw += delta_x;
        self.pitch = (self.pitch + delta_y).clamp(MIN_PITCH, MAX_PITCH);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.reset = None;
        self.distance = (self.distance + delta).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Glide back to the starting view over the next few frames
    pub fn begin_reset(&mut self) {
        self.reset = Some(Self::home());
    }

    pub fn is_resetting(&self) -> bool {
        self.reset.is_some()
    }

    /// Advance a pending reset by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        let Some((yaw, pitch, distance)) = self.reset else {
            return;
        };

        // Exponential smoothing (frame-rate independent).
        // Higher values -> snappier reset.
        let reset_rate: f32 = 12.0;
        let t = 1.0 - (-reset_rate * dt.max(0.0)).exp();

        // Unwind full turns so the reset takes the short way round
        let yaw_target = self.yaw + wrap_angle(yaw - self.yaw);

        self.yaw += (yaw_target - self.yaw) * t;
        self.pitch += (pitch - self.pitch) * t;
        self.distance += (distance - self.distance) * t;
        self.target = self.target.lerp(Vec3::ZERO, t);

        let settled = (yaw_target - self.yaw).abs() < 0.001
            && (pitch - self.pitch).abs() < 0.001
            && (distance - self.distance).abs() < 0.001
            && self.target.length() < 0.001;
        if settled {
            self.yaw = yaw;
            self.pitch = pitch;
            self.distance = distance;
            self.target = Vec3::ZERO;
            self.reset = None;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        let rotation_matrix = Mat4::from_quat(self.rotation().conjugate());
        let translation_matrix = Mat4::from_translation(-self.position());
        rotation_matrix * translation_matrix
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform {
            view: self.view_matrix().to_cols_array_2d(),
            proj: self.projection_matrix().to_cols_array_2d(),
            position: self.position().to_array(),
            _padding: 0.0,
        }
    }

    /// Project a world point to window coordinates (origin top-left).
    /// Returns `None` for points behind the camera or outside the depth range.
    pub fn project_to_screen(&self, world: Vec3, width: f32, height: f32) -> Option<Vec2> {
        let clip = self.build_view_projection_matrix() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }

        let ndc = clip.truncate() / clip.w;
        if !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }

        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * width,
            (1.0 - ndc.y) * 0.5 * height,
        ))
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }
}

fn wrap_angle(angle: f32) -> f32 {
    let tau = std::f32::consts::TAU;
    (angle + std::f32::consts::PI).rem_euclid(tau) - std::f32::consts::PI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_position() {
        let camera = Camera::new(1600, 900);
        let pos = camera.position();
        assert!((pos - Vec3::new(0.0, 2.0, 8.0)).length() < 1e-4);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::new(800, 600);
        camera.zoom(-100.0);
        assert_eq!(camera.distance, MIN_DISTANCE);
        camera.zoom(100.0);
        assert_eq!(camera.distance, MAX_DISTANCE);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::new(800, 600);
        camera.rotate(0.0, 10.0);
        assert_eq!(camera.pitch, MAX_PITCH);
        camera.rotate(0.0, -10.0);
        assert_eq!(camera.pitch, MIN_PITCH);
        // Never far below the horizon
        assert!(camera.position().y > -camera.distance * 0.2);
    }

    #[test]
    fn test_target_projects_to_center() {
        let camera = Camera::new(800, 600);
        let screen = camera.project_to_screen(Vec3::ZERO, 800.0, 600.0).unwrap();
        assert!((screen.x - 400.0).abs() < 1e-2);
        assert!((screen.y - 300.0).abs() < 1e-2);
    }

    #[test]
    fn test_point_above_target_projects_higher() {
        let camera = Camera::new(800, 600);
        let center = camera.project_to_screen(Vec3::ZERO, 800.0, 600.0).unwrap();
        let above = camera
            .project_to_screen(Vec3::new(0.0, 1.0, 0.0), 800.0, 600.0)
            .unwrap();
        assert!(above.y < center.y);
    }

    #[test]
    fn test_point_behind_camera_is_not_projected() {
        let camera = Camera::new(800, 600);
        let behind = camera.position() * 2.0;
        assert!(camera.project_to_screen(behind, 800.0, 600.0).is_none());
    }

    #[test]
    fn test_reset_returns_home() {
        let mut camera = Camera::new(800, 600);
        camera.rotate(1.3, 0.4);
        camera.zoom(4.0);
        camera.begin_reset();
        for _ in 0..600 {
            camera.update(1.0 / 60.0);
        }
        assert!(!camera.is_resetting());
        assert!((camera.position() - Vec3::new(0.0, 2.0, 8.0)).length() < 1e-3);
    }

    #[test]
    fn test_user_input_cancels_reset() {
        let mut camera = Camera::new(800, 600);
        camera.begin_reset();
        camera.zoom(1.0);
        assert!(!camera.is_resetting());
    }
}
