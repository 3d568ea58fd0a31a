use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::path::Path;

use crate::view::{Projection, StereoMode};

/// Every display toggle the host can flip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub legs: bool,
    pub surface: bool,
    pub surface_dashed: bool,
    /// Colour surface legs by depth rather than a single colour.
    pub surface_depth_colours: bool,
    pub crosses: bool,
    pub entrances: bool,
    pub fixed: bool,
    pub exported: bool,
    pub names: bool,
    /// Draw every name, overlapping or not.
    pub names_overlap: bool,
    pub compass: bool,
    pub clino: bool,
    pub scale_bar: bool,
    pub colour_key: bool,
    pub grid: bool,
    pub bounding_box: bool,
    pub tubes: bool,
    pub fog: bool,
    pub antialias: bool,
    pub textures: bool,
    /// Show the compass as world axes rather than a flat dial.
    pub free_rotation: bool,
    pub depth_colours: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            legs: true,
            surface: false,
            surface_dashed: true,
            surface_depth_colours: false,
            crosses: false,
            entrances: false,
            fixed: false,
            exported: false,
            names: false,
            names_overlap: false,
            compass: true,
            clino: true,
            scale_bar: true,
            colour_key: true,
            grid: false,
            bounding_box: false,
            tubes: false,
            fog: false,
            antialias: true,
            textures: false,
            free_rotation: false,
            depth_colours: true,
        }
    }
}

impl DisplayOptions {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Camera settings restored by "defaults".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewDefaults {
    pub scale: f64,
    pub pan_degrees: f64,
    pub tilt_degrees: f64,
    pub projection: Projection,
    pub stereo: StereoMode,
    /// Degrees per second for auto-rotation.
    pub rotation_speed: f64,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan_degrees: 0.0,
            tilt_degrees: FRAC_PI_2.to_degrees(),
            projection: Projection::Orthographic,
            stereo: StereoMode::Mono,
            rotation_speed: 36.0,
        }
    }
}
