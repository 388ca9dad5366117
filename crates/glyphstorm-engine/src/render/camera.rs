use glam::{Mat4, Vec3};
use glyphstorm_sim::SimError;

/// Perspective camera; the default sits on +z looking at the origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub eye: Vec3,
    pub target: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y_deg: 40.0,
            near: 1.0,
            far: 1000.0,
            eye: Vec3::new(0.0, 0.0, 400.0),
            target: Vec3::ZERO,
        }
    }
}

impl Camera {
    pub fn validate(&self) -> Result<(), SimError> {
        let finite = self.eye.is_finite() && self.target.is_finite();
        if !(finite && self.fov_y_deg > 0.0 && self.fov_y_deg < 180.0) {
            return Err(SimError::Configuration(format!(
                "camera fov must be in (0, 180) degrees, got {}",
                self.fov_y_deg
            )));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(SimError::Configuration(format!(
                "camera needs 0 < near < far, got near {} far {}",
                self.near, self.far
            )));
        }
        if self.eye == self.target {
            return Err(SimError::Configuration("camera eye and target coincide".into()));
        }
        Ok(())
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    /// Right-handed projection with wgpu's `[0, 1]` depth range.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), aspect.max(f32::EPSILON), self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    #[test]
    fn origin_projects_to_screen_center() {
        let cam = Camera::default();
        let clip = cam.projection(16.0 / 9.0) * cam.view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn view_space_depth_is_distance_to_eye() {
        let cam = Camera::default();
        let v = cam.view() * Vec4::new(0.0, 0.0, 100.0, 1.0);
        assert!((v.z + 300.0).abs() < 1e-4);
    }

    #[test]
    fn rejects_degenerate_cameras() {
        assert!(Camera::default().validate().is_ok());
        assert!(Camera { near: 0.0, ..Camera::default() }.validate().is_err());
        assert!(Camera { fov_y_deg: 180.0, ..Camera::default() }.validate().is_err());
        assert!(Camera { eye: Vec3::ZERO, ..Camera::default() }.validate().is_err());
    }
}
