//! One-off detection of how station markers can be drawn on this device.

use cavern_base::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::device::{ColourMask, Feature, GraphicsDevice, Primitive, Sprite};
use super::hints::{HintStore, MarkerHints};
use super::markers::{BLOB_DIAMETER, Marker};
use crate::ui::{Colour, Point2};
use crate::view::{Transform, Viewport};

const POINT_SPRITE_EXTENSION: &str = "GL_ARB_point_sprite";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerTechnique {
    /// Round hardware points of the marker's diameter.
    Points,
    /// Points textured with the marker shape.
    Sprites,
    /// Explicit pixel-space line segments.
    Lines,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub blob: MarkerTechnique,
    pub cross: MarkerTechnique,
    pub double_buffered: bool,
    /// False when the viewport was too small for the read-back check; the
    /// techniques are then the line fallbacks and are not remembered.
    pub verified: bool,
}

impl Capabilities {
    pub fn technique(&self, marker: Marker) -> MarkerTechnique {
        match marker {
            Marker::Blob => self.blob,
            Marker::Cross => self.cross,
        }
    }
}

/// Decides the marker techniques, verifying any hardware path by drawing a
/// test marker and reading it back. Remembered per driver in `hints`.
pub fn probe<D: GraphicsDevice>(
    device: &mut D,
    viewport: Viewport,
    hints: &mut dyn HintStore,
) -> Capabilities {
    let key = device.info().identity();
    let double_buffered = device.double_buffered();
    if let Some(saved) = hints.load(&key) {
        info!(%key, blob = ?saved.blob, cross = ?saved.cross, "using remembered marker techniques");
        return Capabilities {
            blob: saved.blob,
            cross: saved.cross,
            double_buffered,
            verified: true,
        };
    }

    let info = device.info();
    let sprites = info.version_at_least(2, 0) || info.has_extension(POINT_SPRITE_EXTENSION);
    let (_, max_point_size) = device.point_size_range();

    let mut blob = if max_point_size >= BLOB_DIAMETER as f32 {
        MarkerTechnique::Points
    } else if sprites {
        MarkerTechnique::Sprites
    } else {
        MarkerTechnique::Lines
    };
    let mut cross = if sprites {
        MarkerTechnique::Sprites
    } else {
        MarkerTechnique::Lines
    };

    let mut verified = true;
    for (marker, technique) in [(Marker::Blob, &mut blob), (Marker::Cross, &mut cross)] {
        if *technique == MarkerTechnique::Lines {
            continue;
        }
        match verify(device, viewport, marker, *technique) {
            Some(true) => {}
            Some(false) => {
                warn!(%key, ?marker, technique = ?*technique, "marker failed read-back check, drawing with lines");
                *technique = MarkerTechnique::Lines;
            }
            None => {
                verified = false;
                *technique = MarkerTechnique::Lines;
            }
        }
    }

    if verified {
        info!(%key, ?blob, ?cross, double_buffered, "marker techniques chosen");
        hints.store(&key, MarkerHints { blob, cross });
    } else {
        info!(%key, width = viewport.width, height = viewport.height, "viewport too small to check markers, using lines for now");
    }
    Capabilities {
        blob,
        cross,
        double_buffered,
        verified,
    }
}

/// Draws `marker` at a known pixel and compares the read-back bytes. `None`
/// when the viewport cannot hold the test marker.
fn verify<D: GraphicsDevice>(
    device: &mut D,
    viewport: Viewport,
    marker: Marker,
    technique: MarkerTechnique,
) -> Option<bool> {
    let size = marker.extent();
    if viewport.width < size * 2 || viewport.height < size * 2 {
        return None;
    }
    let cx = viewport.width / 2;
    let cy = viewport.height / 2;

    let indicator = Transform::indicator(viewport);
    device.set_viewport(viewport);
    device.set_matrices(indicator.projection_matrix(), indicator.modelview_matrix());
    device.set_colour_mask(ColourMask::ALL);
    device.set_feature(Feature::DepthTest, false);
    device.clear(Some(Colour::BLACK), true);
    device.set_colour(Colour::WHITE);
    emit_points(
        device,
        marker,
        technique,
        &[Vec3::new(cx as f64 + 0.5, cy as f64 + 0.5, 0.0)],
    );

    let half = size / 2;
    let left = viewport.x.max(0) as u32 + cx - half;
    let top = viewport.y.max(0) as u32 + cy - half;
    let pixels = device.read_pixels(left, top, size, size);
    device.clear(Some(Colour::BLACK), true);

    let expected: Vec<u8> = marker
        .bitmap()
        .into_iter()
        .flat_map(|lit| if lit { [255u8; 3] } else { [0u8; 3] })
        .collect();
    Some(pixels == expected)
}

/// Emits one marker per point. For [`MarkerTechnique::Lines`] the current
/// transform must map the points to pixels.
pub(crate) fn emit_points<D: GraphicsDevice>(
    device: &mut D,
    marker: Marker,
    technique: MarkerTechnique,
    points: &[Vec3],
) {
    match technique {
        MarkerTechnique::Points => {
            device.set_feature(Feature::Smoothing, true);
            device.set_point_size(marker.extent() as f32);
            device.draw(Primitive::Points, points);
            device.set_point_size(1.0);
            device.set_feature(Feature::Smoothing, false);
        }
        MarkerTechnique::Sprites => {
            let sprite = match marker {
                Marker::Blob => Sprite::Blob,
                Marker::Cross => Sprite::Cross,
            };
            device.set_sprite(Some(sprite));
            device.set_point_size(marker.extent() as f32);
            device.draw(Primitive::Points, points);
            device.set_sprite(None);
            device.set_point_size(1.0);
        }
        MarkerTechnique::Lines => {
            let segments: Vec<Vec3> = points
                .iter()
                .flat_map(|p| {
                    marker
                        .line_segments(Point2::new(p.x, p.y))
                        .into_iter()
                        .map(move |v| Vec3::new(v.x, v.y, p.z))
                })
                .collect();
            device.draw(Primitive::Lines, &segments);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::DeviceInfo;
    use crate::gfx::hints::MemoryHints;
    use crate::software::SoftwareDevice;

    fn viewport() -> Viewport {
        Viewport::new(64, 64)
    }

    #[test]
    fn large_points_are_used_for_blobs() {
        let mut device = SoftwareDevice::new(64, 64).with_max_point_size(10.0);
        let mut hints = MemoryHints::new();
        let caps = probe(&mut device, viewport(), &mut hints);
        assert_eq!(caps.blob, MarkerTechnique::Points);
        assert_eq!(caps.cross, MarkerTechnique::Sprites);
        assert_eq!(hints.writes(), 1);
    }

    #[test]
    fn old_driver_without_sprites_uses_lines() {
        let mut device = SoftwareDevice::new(64, 64)
            .with_max_point_size(1.0)
            .with_info(DeviceInfo {
                vendor: "Old".into(),
                renderer: "Soft".into(),
                version: "1.4".into(),
                extensions: Vec::new(),
            });
        let mut hints = MemoryHints::new();
        let caps = probe(&mut device, viewport(), &mut hints);
        assert_eq!(caps.blob, MarkerTechnique::Lines);
        assert_eq!(caps.cross, MarkerTechnique::Lines);
    }

    #[test]
    fn tiny_viewport_is_not_remembered() {
        let mut device = SoftwareDevice::new(64, 64).with_broken_sprites();
        let mut hints = MemoryHints::new();
        let caps = probe(&mut device, Viewport::new(10, 10), &mut hints);
        assert!(!caps.verified);
        assert_eq!(caps.cross, MarkerTechnique::Lines);
        assert_eq!(hints.writes(), 0);

        let caps = probe(&mut device, viewport(), &mut hints);
        assert!(caps.verified);
        assert_eq!(caps.cross, MarkerTechnique::Lines);
        assert_eq!(hints.writes(), 1);
    }

    #[test]
    fn lines_technique_matches_bitmap() {
        for marker in [Marker::Blob, Marker::Cross] {
            let mut device = SoftwareDevice::new(64, 64);
            assert_eq!(verify(&mut device, viewport(), marker, MarkerTechnique::Lines), Some(true));
        }
    }
}
