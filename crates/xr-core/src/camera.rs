//! Camera description shared by the occlusion sampler and the particle field.
//!
//! This intentionally avoids any platform API. Hosts copy the viewer pose and
//! projection parameters of the eye they test against (usually the left eye)
//! into an `XrCamera` each frame.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

/// Right-handed perspective camera looking down its local -Z axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct XrCamera {
    pub position: Vec3,
    pub rotation: Quat,
    pub fovy_radians: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for XrCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.6, 0.0),
            rotation: Quat::IDENTITY,
            fovy_radians: std::f32::consts::FRAC_PI_2,
            aspect: 1.0,
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

impl XrCamera {
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        Self {
            position: eye,
            rotation,
            ..Self::default()
        }
    }

    pub fn with_projection(
        mut self,
        fovy_radians: f32,
        aspect: f32,
        znear: f32,
        zfar: f32,
    ) -> Self {
        self.fovy_radians = fovy_radians;
        self.aspect = aspect;
        self.znear = znear;
        self.zfar = zfar;
        self
    }

    /// Camera-to-world transform.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    /// World-to-camera transform.
    pub fn view_matrix(&self) -> Mat4 {
        self.world_matrix().inverse()
    }

    /// Clip-space projection with a \[0, 1\] depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Normalized device coordinates of `point`, or `None` when it sits on or
    /// behind the eye plane.
    pub fn project(&self, point: Vec3) -> Option<Vec3> {
        let clip = self.projection_matrix() * self.view_matrix() * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(clip.truncate() / clip.w)
    }

    /// Perpendicular distance from the camera's view plane; negative behind it.
    pub fn distance_to_view_plane(&self, point: Vec3) -> f32 {
        -self.view_matrix().transform_point3(point).z
    }

    /// World-space ray through an NDC position. Returns `(origin, direction)`.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> (Vec3, Vec3) {
        let inv = (self.projection_matrix() * self.view_matrix()).inverse();
        let far = inv.project_point3(ndc.extend(1.0));
        let dir = (far - self.position).normalize_or_zero();
        (self.position, dir)
    }

    /// Inverse of the camera rotation with its yaw stripped, so billboards
    /// follow head pitch and roll but keep facing the viewer horizontally.
    pub fn pitch_roll_inverse(&self) -> Mat4 {
        let (_yaw, pitch, roll) = self.rotation.to_euler(EulerRot::YXZ);
        Mat4::from_euler(EulerRot::YXZ, 0.0, pitch, roll).inverse()
    }
}
