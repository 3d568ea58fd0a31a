//! View state and the world <-> screen transform.

use cavern_base::{Rotation, Vec3};
use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

use crate::ui::Point2;

pub const MIN_SCALE: f64 = 1.0e-4;
pub const MAX_SCALE: f64 = 1.0e6;

/// Half-angle of the perspective frustum.
const PERSPECTIVE_HALF_APERTURE_DEG: f64 = 25.0;
const PERSPECTIVE_NEAR_PLANE: f64 = 1.0;
/// Eye separation as a fraction of the viewer distance.
const EYE_SEPARATION_RATIO: f64 = 1.0 / 20.0;
/// Slack either side of the orthographic depth range, relative to the diameter.
const ORTHO_DEPTH_MARGIN: f64 = 0.01;
/// Window depth the orthographic translation is re-derived at.
const ORTHO_TRANSLATION_DEPTH: f64 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    #[default]
    Orthographic,
    Perspective,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StereoMode {
    #[default]
    Mono,
    Split,
    Anaglyph,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eye {
    Mono,
    Left,
    Right,
}

impl Eye {
    fn sign(self) -> f64 {
        match self {
            Eye::Mono => 0.0,
            Eye::Left => -1.0,
            Eye::Right => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Left and right halves used for side-by-side stereo.
    pub fn split(&self) -> (Viewport, Viewport) {
        let half = self.width / 2;
        let left = Viewport {
            width: half,
            ..*self
        };
        let right = Viewport {
            x: self.x + half as i32,
            width: self.width - half,
            ..*self
        };
        (left, right)
    }

    pub fn centre(&self) -> Point2 {
        Point2::new(
            self.x as f64 + self.width as f64 * 0.5,
            self.y as f64 + self.height as f64 * 0.5,
        )
    }
}

/// Camera parameters owned by the renderer.
#[derive(Clone, Debug)]
pub struct ViewState {
    scale: f64,
    pan: f64,
    tilt: f64,
    translation: Vec3,
    projection: Projection,
    stereo: StereoMode,
    volume_diameter: f64,
    rotation: Rotation,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan: 0.0,
            tilt: FRAC_PI_2,
            translation: Vec3::ZERO,
            projection: Projection::Orthographic,
            stereo: StereoMode::Mono,
            volume_diameter: 1.0,
            rotation: Rotation::from_tilt_pan(FRAC_PI_2, 0.0),
        }
    }
}

impl ViewState {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pan(&self) -> f64 {
        self.pan
    }

    pub fn tilt(&self) -> f64 {
        self.tilt
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn is_perspective(&self) -> bool {
        self.projection == Projection::Perspective
    }

    pub fn stereo(&self) -> StereoMode {
        self.stereo
    }

    pub fn volume_diameter(&self) -> f64 {
        self.volume_diameter
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Returns true if the stored value changed.
    pub fn set_scale(&mut self, scale: f64) -> bool {
        let scale = if scale.is_finite() {
            scale.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            self.scale
        };
        let changed = scale != self.scale;
        self.scale = scale;
        changed
    }

    pub fn set_pan(&mut self, pan: f64) -> bool {
        let pan = wrap_angle(pan);
        let changed = pan != self.pan;
        self.pan = pan;
        self.rebuild_rotation();
        changed
    }

    pub fn set_tilt(&mut self, tilt: f64) -> bool {
        let tilt = if tilt.is_finite() {
            tilt.clamp(-FRAC_PI_2, FRAC_PI_2)
        } else {
            self.tilt
        };
        let changed = tilt != self.tilt;
        self.tilt = tilt;
        self.rebuild_rotation();
        changed
    }

    pub fn set_translation(&mut self, translation: Vec3) -> bool {
        let changed = translation != self.translation;
        if translation.is_finite() {
            self.translation = translation;
        }
        changed
    }

    pub fn set_projection(&mut self, projection: Projection) -> bool {
        let changed = projection != self.projection;
        self.projection = projection;
        changed
    }

    pub fn set_stereo(&mut self, stereo: StereoMode) -> bool {
        let changed = stereo != self.stereo;
        self.stereo = stereo;
        changed
    }

    pub fn set_volume_diameter(&mut self, diameter: f64) {
        self.volume_diameter = if diameter.is_finite() { diameter.max(1.0) } else { 1.0 };
    }

    fn rebuild_rotation(&mut self) {
        self.rotation = Rotation::from_tilt_pan(self.tilt, self.pan);
    }
}

/// Wraps an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

impl ScreenPoint {
    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    /// False for points behind the viewer or clipped by near/far planes.
    pub fn in_depth_range(&self) -> bool {
        self.depth > 0.0 && self.depth < 1.0
    }
}

/// Projection and model-view matrices plus the viewport they map into.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    projection: Matrix4<f64>,
    modelview: Matrix4<f64>,
    combined: Matrix4<f64>,
    inverse: Option<Matrix4<f64>>,
    viewport: Viewport,
    units_per_pixel: Option<f64>,
}

impl Transform {
    pub fn from_matrices(projection: Matrix4<f64>, modelview: Matrix4<f64>, viewport: Viewport) -> Self {
        let combined = projection * modelview;
        Self {
            projection,
            modelview,
            combined,
            inverse: combined.invert(),
            viewport,
            units_per_pixel: None,
        }
    }

    /// Fixed pixel-space projection for on-screen overlays.
    pub fn indicator(viewport: Viewport) -> Self {
        let w = viewport.width.max(1) as f64;
        let h = viewport.height.max(1) as f64;
        let projection = cgmath::ortho(0.0, w, h, 0.0, -1.0, 1.0);
        let mut transform = Self::from_matrices(projection, Matrix4::identity(), viewport);
        transform.units_per_pixel = Some(1.0);
        transform
    }

    /// Camera transform for drawing survey data as seen by `eye`.
    pub fn data(view: &ViewState, viewport: Viewport, eye: Eye) -> Self {
        let w = viewport.width.max(1) as f64;
        let h = viewport.height.max(1) as f64;
        let aspect = h / w;
        let diameter = view.volume_diameter();
        let rotation = view.rotation().to_matrix();

        match view.projection() {
            Projection::Orthographic => {
                let mut lr = diameter / view.scale() * 0.5;
                let mut tb = lr;
                if aspect >= 1.0 {
                    tb *= aspect;
                } else {
                    lr /= aspect;
                }
                let margin = diameter * ORTHO_DEPTH_MARGIN;
                let projection = cgmath::ortho(-lr, lr, -tb, tb, -margin, diameter + margin);
                let base = Matrix4::from_translation(Vector3::new(0.0, 0.0, -0.5 * diameter)) * rotation;

                // Keep the model centred in depth: move the translation point
                // onto the mid-depth plane without changing its screen position.
                let unadjusted = Self::from_matrices(projection, base, viewport);
                let t = view.translation();
                let shifted = unadjusted
                    .project(t)
                    .and_then(|s| unadjusted.unproject(s.x, s.y, ORTHO_TRANSLATION_DEPTH))
                    .unwrap_or(t);
                let modelview =
                    base * Matrix4::from_translation(Vector3::new(shifted.x, shifted.y, shifted.z));
                let mut transform = Self::from_matrices(projection, modelview, viewport);
                transform.units_per_pixel = Some(2.0 * lr / w);
                transform
            }
            Projection::Perspective => {
                let near = PERSPECTIVE_NEAR_PLANE;
                let far = diameter * 5.0 + near;
                let lr = near * PERSPECTIVE_HALF_APERTURE_DEG.to_radians().tan();
                let tb = lr * aspect;
                let distance = diameter / view.scale();
                let eye_sep = distance * EYE_SEPARATION_RATIO;
                let sign = eye.sign();
                let shift = -sign * 0.5 * eye_sep * near / distance;
                let projection = cgmath::frustum(-lr + shift, lr + shift, -tb, tb, near, far);
                let t = view.translation();
                let modelview =
                    Matrix4::from_translation(Vector3::new(-sign * 0.5 * eye_sep, 0.0, -distance))
                        * rotation
                        * Matrix4::from_translation(Vector3::new(t.x, t.y, t.z));
                Self::from_matrices(projection, modelview, viewport)
            }
        }
    }

    pub fn projection_matrix(&self) -> &Matrix4<f64> {
        &self.projection
    }

    pub fn modelview_matrix(&self) -> &Matrix4<f64> {
        &self.modelview
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// World units covered by one horizontal pixel, orthographic views only.
    pub fn units_per_pixel(&self) -> Option<f64> {
        self.units_per_pixel
    }

    pub fn project(&self, p: Vec3) -> Option<ScreenPoint> {
        let clip = self.combined * Vector4::new(p.x, p.y, p.z, 1.0);
        if clip.w.abs() <= f64::EPSILON {
            return None;
        }
        let ndc = Vector3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w);
        let vp = self.viewport;
        Some(ScreenPoint {
            x: vp.x as f64 + (ndc.x + 1.0) * 0.5 * vp.width as f64,
            y: vp.y as f64 + (1.0 - ndc.y) * 0.5 * vp.height as f64,
            depth: (ndc.z + 1.0) * 0.5,
        })
    }

    pub fn unproject(&self, x: f64, y: f64, depth: f64) -> Option<Vec3> {
        let inverse = self.inverse?;
        let vp = self.viewport;
        if vp.is_empty() {
            return None;
        }
        let ndc = Vector4::new(
            2.0 * (x - vp.x as f64) / vp.width as f64 - 1.0,
            1.0 - 2.0 * (y - vp.y as f64) / vp.height as f64,
            2.0 * depth - 1.0,
            1.0,
        );
        let world = inverse * ndc;
        if world.w.abs() <= f64::EPSILON {
            return None;
        }
        Some(Vec3::new(world.x / world.w, world.y / world.w, world.z / world.w))
    }
}
