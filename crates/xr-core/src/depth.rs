use crate::camera::XrCamera;
use crate::error::DepthError;
use glam::{Vec2, Vec3};

/// Read-only access to the current depth frame.
///
/// Depth values are perpendicular distances from the camera plane in meters;
/// 0 means "no data". Texture coordinates run left to right (`u`) and bottom
/// to top (`v`), matching `(ndc + 1) / 2`.
pub trait DepthSource {
    fn depth_at(&self, u: f32, v: f32) -> f32;

    /// Nearest valid depth in the frame, or 0 when the frame holds no data.
    fn min_depth(&self) -> f32;

    /// Intersect the camera ray through `ndc` with the sensed surface.
    fn raycast(&self, camera: &XrCamera, ndc: Vec2) -> Option<Vec3> {
        let depth = self.depth_at((ndc.x + 1.0) * 0.5, (ndc.y + 1.0) * 0.5);
        if depth <= 0.0 {
            return None;
        }
        let (origin, dir) = camera.ray_from_ndc(ndc);
        let cos = dir.dot(camera.forward());
        if cos <= f32::EPSILON {
            return None;
        }
        Some(origin + dir * (depth / cos))
    }
}

/// CPU copy of a depth image, rows stored top to bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
    min_depth: f32,
}

impl DepthBuffer {
    pub fn from_meters(width: u32, height: u32, data: Vec<f32>) -> Result<Self, DepthError> {
        if width == 0 || height == 0 {
            return Err(DepthError::ZeroSize { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(DepthError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let mut buffer = Self {
            width,
            height,
            data,
            min_depth: 0.0,
        };
        for d in &mut buffer.data {
            *d = sanitize(*d);
        }
        buffer.recompute_min();
        Ok(buffer)
    }

    /// Build from raw sensor units, e.g. millimeters with `raw_value_to_meters = 0.001`.
    pub fn from_raw_u16(
        width: u32,
        height: u32,
        raw: &[u16],
        raw_value_to_meters: f32,
    ) -> Result<Self, DepthError> {
        let data = raw
            .iter()
            .map(|&r| r as f32 * raw_value_to_meters)
            .collect();
        Self::from_meters(width, height, data)
    }

    pub fn filled(width: u32, height: u32, meters: f32) -> Result<Self, DepthError> {
        let len = width as usize * height as usize;
        Self::from_meters(width, height, vec![meters; len])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel at column `x`, row `y` (row 0 is the top edge).
    pub fn texel(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize).copied()
    }

    pub fn set_texel(&mut self, x: u32, y: u32, meters: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = sanitize(meters);
        self.recompute_min();
    }

    fn recompute_min(&mut self) {
        self.min_depth = self
            .data
            .iter()
            .copied()
            .filter(|d| *d > 0.0)
            .fold(f32::INFINITY, f32::min);
        if !self.min_depth.is_finite() {
            self.min_depth = 0.0;
        }
    }
}

impl DepthSource for DepthBuffer {
    fn depth_at(&self, u: f32, v: f32) -> f32 {
        if !u.is_finite() || !v.is_finite() {
            return 0.0;
        }
        let x = ((u.clamp(0.0, 1.0) * self.width as f32) as u32).min(self.width - 1);
        let y = (((1.0 - v.clamp(0.0, 1.0)) * self.height as f32) as u32).min(self.height - 1);
        self.texel(x, y).unwrap_or(0.0)
    }

    fn min_depth(&self) -> f32 {
        self.min_depth
    }
}

#[inline]
fn sanitize(meters: f32) -> f32 {
    if meters.is_finite() && meters > 0.0 {
        meters
    } else {
        0.0
    }
}
