use crate::camera::XrCamera;
use crate::constants::*;
use crate::depth::DepthSource;
use crate::error::{check_range, ConfigError};
use glam::Vec3;

/// NDC box a point must fall inside before its depth is sampled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FovWindow {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    pub z_min: f32,
    pub z_max: f32,
}

impl Default for FovWindow {
    fn default() -> Self {
        Self {
            x_min: FOV_X_MIN,
            x_max: FOV_X_MAX,
            y_min: FOV_Y_MIN,
            y_max: FOV_Y_MAX,
            z_min: FOV_Z_MIN,
            z_max: FOV_Z_MAX,
        }
    }
}

impl FovWindow {
    /// The whole clip volume.
    pub const FULL: FovWindow = FovWindow {
        x_min: -1.0,
        x_max: 1.0,
        y_min: -1.0,
        y_max: 1.0,
        z_min: 0.0,
        z_max: 1.0,
    };

    #[inline]
    pub fn contains(&self, ndc: Vec3) -> bool {
        ndc.x >= self.x_min
            && ndc.x <= self.x_max
            && ndc.y >= self.y_min
            && ndc.y <= self.y_max
            && ndc.z >= self.z_min
            && ndc.z <= self.z_max
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("fov.x_min", self.x_min, -1.0, self.x_max)?;
        check_range("fov.x_max", self.x_max, self.x_min, 1.0)?;
        check_range("fov.y_min", self.y_min, -1.0, self.y_max)?;
        check_range("fov.y_max", self.y_max, self.y_min, 1.0)?;
        check_range("fov.z_min", self.z_min, 0.0, self.z_max)?;
        check_range("fov.z_max", self.z_max, self.z_min, 1.0)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OcclusionResult {
    pub is_within_fov: bool,
    pub is_occluded: bool,
    /// `|distance_to_camera_plane - measured_depth|`, drives smooth fading.
    pub delta_depth: f32,
    /// Sensed depth in meters; 0 when there was no data or the point was outside the window.
    pub measured_depth: f32,
    pub distance_to_camera_plane: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OcclusionSampler {
    pub fov: FovWindow,
    pub min_depth_guard: f32,
}

impl Default for OcclusionSampler {
    fn default() -> Self {
        Self {
            fov: FovWindow::default(),
            min_depth_guard: MIN_DEPTH_GUARD_M,
        }
    }
}

impl OcclusionSampler {
    pub fn new(fov: FovWindow, min_depth_guard: f32) -> Result<Self, ConfigError> {
        fov.validate()?;
        check_range("min_depth_guard", min_depth_guard, 0.0, f32::MAX)?;
        Ok(Self {
            fov,
            min_depth_guard,
        })
    }

    /// Classify `point` against the sensed surface behind it.
    ///
    /// A point is occluded when the sensor has no reading for its pixel or the
    /// reading is nearer than the point. Outside the window nothing is sampled
    /// and the result reports neither occlusion nor depth.
    pub fn sample(
        &self,
        point: Vec3,
        camera: &XrCamera,
        depth: &dyn DepthSource,
    ) -> OcclusionResult {
        let Some(ndc) = camera.project(point) else {
            return OcclusionResult::default();
        };
        if !self.fov.contains(ndc) {
            return OcclusionResult::default();
        }
        let measured_depth = depth.depth_at((ndc.x + 1.0) * 0.5, (ndc.y + 1.0) * 0.5);
        let measured_depth = if measured_depth.is_finite() {
            measured_depth.max(0.0)
        } else {
            0.0
        };
        let distance_to_camera_plane = camera.distance_to_view_plane(point);
        OcclusionResult {
            is_within_fov: true,
            is_occluded: measured_depth == 0.0 || measured_depth <= distance_to_camera_plane,
            delta_depth: (distance_to_camera_plane - measured_depth).abs(),
            measured_depth,
            distance_to_camera_plane,
        }
    }

    /// False for frames whose nearest reading is implausibly close, typically
    /// while the sensor warms up. Everything depth-tested should be hidden then.
    pub fn depth_frame_is_valid(&self, depth: &dyn DepthSource) -> bool {
        depth.min_depth() >= self.min_depth_guard
    }
}
